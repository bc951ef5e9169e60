//! Port interfaces for draining the queue

use async_trait::async_trait;
use routesync_domain::{DeleteOutcome, QueueMessage, ReceiptHandle, Result};

/// Consumer side of the route queue
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Poll for a bounded batch of pending deliveries.
    ///
    /// An empty vector means nothing is pending.
    async fn receive_batch(&self) -> Result<Vec<QueueMessage>>;

    /// Delete exactly the given deliveries.
    ///
    /// Stale or already-deleted handles are reported per entry in the
    /// outcome; `Err` is reserved for the call itself failing.
    async fn delete_batch(&self, handles: &[ReceiptHandle]) -> Result<DeleteOutcome>;
}
