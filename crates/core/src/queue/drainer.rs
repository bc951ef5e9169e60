//! Consume-then-acknowledge cycle for the route queue.
//!
//! Message bodies are not inspected: every received delivery is treated as
//! processed and deleted. Failures never escape [`QueueDrainer::drain_cycle`];
//! deliveries that could not be deleted become visible again once the queue's
//! own visibility timeout expires.

use std::sync::Arc;

use routesync_domain::ReceiptHandle;
use tracing::{debug, error, info, instrument, warn};

use super::ports::MessageQueue;

/// Counters for one drain cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Deliveries returned by the receive call
    pub received: usize,
    /// Deliveries acknowledged
    pub deleted: usize,
    /// Deliveries left for redelivery
    pub failed: usize,
    /// The receive call itself failed
    pub receive_failed: bool,
}

impl DrainReport {
    /// True when everything received was acknowledged
    pub fn is_clean(&self) -> bool {
        !self.receive_failed && self.failed == 0
    }
}

/// Drains one batch of deliveries per cycle
pub struct QueueDrainer {
    queue: Arc<dyn MessageQueue>,
}

impl QueueDrainer {
    /// Create a drainer over `queue`
    pub fn new(queue: Arc<dyn MessageQueue>) -> Self {
        Self { queue }
    }

    /// Receive one batch and delete every delivery in it.
    #[instrument(skip(self))]
    pub async fn drain_cycle(&self) -> DrainReport {
        let mut report = DrainReport::default();

        let messages = match self.queue.receive_batch().await {
            Ok(messages) => messages,
            Err(err) => {
                error!(error = %err, "Failed to receive queue messages");
                report.receive_failed = true;
                return report;
            }
        };

        report.received = messages.len();
        if messages.is_empty() {
            debug!("No pending queue messages");
            return report;
        }

        let handles: Vec<ReceiptHandle> =
            messages.into_iter().map(|message| message.receipt_handle).collect();
        info!(count = handles.len(), "Deleting received queue messages");

        match self.queue.delete_batch(&handles).await {
            Ok(outcome) => {
                for failure in &outcome.failed {
                    warn!(
                        entry = %failure.id,
                        code = %failure.code,
                        message = failure.message.as_deref().unwrap_or(""),
                        "Queue message not deleted; left for redelivery"
                    );
                }
                report.deleted = outcome.deleted;
                report.failed = outcome.failed.len();
            }
            Err(err) => {
                error!(error = %err, count = handles.len(), "Failed to delete queue messages");
                report.failed = handles.len();
            }
        }

        info!(
            received = report.received,
            deleted = report.deleted,
            failed = report.failed,
            "Drain cycle complete"
        );
        report
    }
}
