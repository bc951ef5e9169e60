//! Request and response bodies for the SQS JSON protocol

use routesync_domain::BatchEntryFailure;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SendMessageBatchRequest<'a> {
    pub queue_url: &'a str,
    pub entries: Vec<SendMessageEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SendMessageEntry {
    pub id: String,
    pub message_body: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ReceiveMessageRequest<'a> {
    pub queue_url: &'a str,
    pub max_number_of_messages: u32,
    pub wait_time_seconds: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ReceiveMessageResponse {
    /// Absent when nothing is pending
    #[serde(default)]
    pub messages: Option<Vec<WireMessage>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireMessage {
    #[serde(default)]
    pub message_id: Option<String>,
    pub receipt_handle: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DeleteMessageBatchRequest<'a> {
    pub queue_url: &'a str,
    pub entries: Vec<DeleteMessageEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DeleteMessageEntry {
    pub id: String,
    pub receipt_handle: String,
}

/// Shared by `SendMessageBatch` and `DeleteMessageBatch`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BatchResultResponse {
    #[serde(default)]
    pub successful: Vec<IgnoredAny>,
    #[serde(default)]
    pub failed: Vec<BatchErrorEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BatchErrorEntry {
    pub id: String,
    #[serde(default)]
    pub sender_fault: bool,
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<BatchErrorEntry> for BatchEntryFailure {
    fn from(entry: BatchErrorEntry) -> Self {
        Self {
            id: entry.id,
            code: entry.code,
            message: entry.message,
            sender_fault: entry.sender_fault,
        }
    }
}

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(rename = "__type", default)]
    pub kind: Option<String>,
    #[serde(alias = "Message", default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn describe(&self) -> String {
        let kind = self.kind.as_deref().map(|k| k.rsplit('#').next().unwrap_or(k));
        match (kind, self.message.as_deref()) {
            (Some(kind), Some(message)) => format!("{kind}: {message}"),
            (Some(kind), None) => kind.to_string(),
            (None, Some(message)) => message.to_string(),
            (None, None) => "no error details".to_string(),
        }
    }
}
