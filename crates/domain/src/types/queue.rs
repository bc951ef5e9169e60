//! Queue envelope types

use std::fmt;

use serde::{Deserialize, Serialize};

/// One-time token identifying a specific delivery of a queue message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A received delivery. The body is opaque to the drain cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Service-assigned id, when reported
    pub message_id: Option<String>,
    /// Needed to acknowledge this delivery
    pub receipt_handle: ReceiptHandle,
    pub body: String,
}

/// Per-entry rejection reported by a batch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntryFailure {
    /// Position of the entry in the caller's slice
    pub id: String,
    /// Service error code
    pub code: String,
    pub message: Option<String>,
    /// `true` when the queue blames the request rather than itself
    pub sender_fault: bool,
}

/// Result of a publish call the queue service accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishAck {
    /// Routes enqueued
    pub accepted: usize,
    /// Routes the queue rejected individually
    pub failed: Vec<BatchEntryFailure>,
}

/// Result of a delete call; failures are per handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Deliveries acknowledged
    pub deleted: usize,
    /// Handles that were not deleted
    pub failed: Vec<BatchEntryFailure>,
}
