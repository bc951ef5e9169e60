//! Route publisher and message consumer over one queue

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use routesync_core::{MessageQueue, RoutePublisher};
use routesync_domain::constants::QUEUE_BATCH_LIMIT;
use routesync_domain::{
    BatchEntryFailure, DeleteOutcome, PublishAck, QueueConfig, QueueMessage, ReceiptHandle, Result, Route,
    RouteSyncError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::wire::{
    BatchResultResponse, DeleteMessageBatchRequest, DeleteMessageEntry, ErrorResponse,
    ReceiveMessageRequest, ReceiveMessageResponse, SendMessageBatchRequest, SendMessageEntry,
};
use crate::errors::InfraError;
use crate::http::HttpClient;

const TARGET_HEADER: &str = "X-Amz-Target";
const TARGET_PREFIX: &str = "AmazonSQS.";
const JSON_PROTOCOL: &str = "application/x-amz-json-1.0";

const SEND_MESSAGE_BATCH: &str = "SendMessageBatch";
const RECEIVE_MESSAGE: &str = "ReceiveMessage";
const DELETE_MESSAGE_BATCH: &str = "DeleteMessageBatch";

/// Failure code recorded for handles whose whole delete call failed
const CALL_FAILED_CODE: &str = "BatchCallFailed";

/// Client for a single queue.
///
/// Publishing and draining share the client; batches larger than the service
/// limit are split into several calls.
pub struct QueueClient {
    http: HttpClient,
    endpoint: String,
    queue_url: String,
    max_messages: u32,
    wait_time_seconds: u32,
}

impl QueueClient {
    /// Create a client for the configured queue.
    ///
    /// The HTTP timeout is extended by the long-poll wait so a receive
    /// call is never cut short by its own wait.
    ///
    /// # Errors
    /// Returns `RouteSyncError::Config` if the HTTP client cannot be built.
    pub fn new(config: &QueueConfig) -> Result<Self> {
        let timeout = config.request_timeout()
            + std::time::Duration::from_secs(u64::from(config.wait_time_seconds));
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: &QueueConfig, http: HttpClient) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            queue_url: config.queue_url.clone(),
            max_messages: config.max_messages,
            wait_time_seconds: config.wait_time_seconds,
        }
    }

    /// Serialise and send `routes`, one message per route.
    ///
    /// An empty batch is acknowledged without contacting the queue.
    /// Entries the queue rejects individually are returned in the ack; the
    /// call only fails when nothing at all was accepted.
    ///
    /// # Errors
    /// Returns `RouteSyncError::QueuePublish` if a call fails or every entry
    /// is rejected.
    #[instrument(skip(self, routes), fields(routes = routes.len()))]
    pub async fn publish_routes(&self, routes: &[Route]) -> Result<PublishAck> {
        if routes.is_empty() {
            debug!("No routes to publish; skipping queue call");
            return Ok(PublishAck::default());
        }

        let mut ack = PublishAck::default();
        for (chunk_idx, chunk) in routes.chunks(QUEUE_BATCH_LIMIT).enumerate() {
            let entries = chunk
                .iter()
                .enumerate()
                .map(|(idx, route)| {
                    let message_body = serde_json::to_string(route).map_err(|err| {
                        RouteSyncError::QueuePublish(json_failure(&route.route_id, "encode", err))
                    })?;
                    Ok(SendMessageEntry {
                        id: (chunk_idx * QUEUE_BATCH_LIMIT + idx).to_string(),
                        message_body,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let request = SendMessageBatchRequest { queue_url: &self.queue_url, entries };
            let response: BatchResultResponse =
                self.call(SEND_MESSAGE_BATCH, &request, RouteSyncError::QueuePublish).await?;

            ack.accepted += response.successful.len();
            ack.failed.extend(response.failed.into_iter().map(Into::into));
        }

        if ack.accepted == 0 && !ack.failed.is_empty() {
            let first = &ack.failed[0];
            return Err(RouteSyncError::QueuePublish(format!(
                "queue rejected all {} routes (first: {})",
                ack.failed.len(),
                first.code
            )));
        }

        if ack.failed.is_empty() {
            info!(accepted = ack.accepted, "Published routes");
        } else {
            for failure in &ack.failed {
                warn!(
                    entry = %failure.id,
                    code = %failure.code,
                    sender_fault = failure.sender_fault,
                    "Queue rejected route"
                );
            }
            warn!(
                accepted = ack.accepted,
                failed = ack.failed.len(),
                "Route publish completed with errors"
            );
        }
        Ok(ack)
    }

    /// Poll for up to `max_messages` deliveries.
    ///
    /// # Errors
    /// Returns `RouteSyncError::QueueReceive` if the call fails.
    #[instrument(skip(self))]
    pub async fn receive_messages(&self) -> Result<Vec<QueueMessage>> {
        let request = ReceiveMessageRequest {
            queue_url: &self.queue_url,
            max_number_of_messages: self.max_messages,
            wait_time_seconds: self.wait_time_seconds,
        };
        let response: ReceiveMessageResponse =
            self.call(RECEIVE_MESSAGE, &request, RouteSyncError::QueueReceive).await?;

        let messages: Vec<QueueMessage> = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|message| QueueMessage {
                message_id: message.message_id,
                receipt_handle: ReceiptHandle::new(message.receipt_handle),
                body: message.body,
            })
            .collect();

        debug!(count = messages.len(), "Received queue messages");
        Ok(messages)
    }

    /// Delete exactly the given deliveries.
    ///
    /// Handles fail independently; per-handle failures are reported in the
    /// outcome rather than as an error. When one chunk's call fails but
    /// another succeeds, the failed chunk's handles are reported as failed
    /// entries so the counts of the successful chunks are kept.
    ///
    /// # Errors
    /// Returns `RouteSyncError::QueueDelete` if every call fails outright.
    #[instrument(skip(self, handles), fields(handles = handles.len()))]
    pub async fn delete_messages(&self, handles: &[ReceiptHandle]) -> Result<DeleteOutcome> {
        let mut outcome = DeleteOutcome::default();
        if handles.is_empty() {
            return Ok(outcome);
        }

        let mut last_error = None;
        let mut any_call_succeeded = false;
        for (chunk_idx, chunk) in handles.chunks(QUEUE_BATCH_LIMIT).enumerate() {
            let first_id = chunk_idx * QUEUE_BATCH_LIMIT;
            let entries = chunk
                .iter()
                .enumerate()
                .map(|(idx, handle)| DeleteMessageEntry {
                    id: (first_id + idx).to_string(),
                    receipt_handle: handle.as_str().to_string(),
                })
                .collect();

            let request = DeleteMessageBatchRequest { queue_url: &self.queue_url, entries };
            let result: Result<BatchResultResponse> =
                self.call(DELETE_MESSAGE_BATCH, &request, RouteSyncError::QueueDelete).await;

            match result {
                Ok(response) => {
                    any_call_succeeded = true;
                    outcome.deleted += response.successful.len();
                    outcome.failed.extend(response.failed.into_iter().map(Into::into));
                }
                Err(err) => {
                    warn!(
                        chunk = chunk_idx,
                        handles = chunk.len(),
                        error = %err,
                        "Delete batch call failed"
                    );
                    outcome.failed.extend((0..chunk.len()).map(|idx| BatchEntryFailure {
                        id: (first_id + idx).to_string(),
                        code: CALL_FAILED_CODE.to_string(),
                        message: Some(err.message().to_string()),
                        sender_fault: false,
                    }));
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if !any_call_succeeded => Err(err),
            _ => Ok(outcome),
        }
    }

    /// Issue one protocol call, wrapping every failure with `wrap`.
    async fn call<Req, Resp>(
        &self,
        action: &str,
        body: &Req,
        wrap: fn(String) -> RouteSyncError,
    ) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload =
            serde_json::to_vec(body).map_err(|err| wrap(json_failure(action, "encode", err)))?;

        let request = self
            .http
            .request(Method::POST, &self.endpoint)
            .header(TARGET_HEADER, format!("{TARGET_PREFIX}{action}"))
            .header(CONTENT_TYPE, JSON_PROTOCOL)
            .body(payload);

        let response =
            self.http.send(request).await.map_err(|err| wrap(format!("{action}: {}", err.message())))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| wrap(format!("{action}: failed to read response: {}", err.without_url())))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|err| err.describe())
                .unwrap_or(text);
            return Err(wrap(format!("{action} returned HTTP {}: {detail}", status.as_u16())));
        }

        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text).map_err(|err| wrap(json_failure(action, "decode", err)))
    }
}

/// Describe a serde failure in the wording of [`InfraError`]'s JSON mapping.
fn json_failure(context: &str, step: &str, err: serde_json::Error) -> String {
    format!("{context}: failed to {step} body: {}", InfraError::from(err).0.message())
}

#[async_trait]
impl RoutePublisher for QueueClient {
    async fn publish(&self, routes: &[Route]) -> Result<PublishAck> {
        self.publish_routes(routes).await
    }
}

#[async_trait]
impl MessageQueue for QueueClient {
    async fn receive_batch(&self) -> Result<Vec<QueueMessage>> {
        self.receive_messages().await
    }

    async fn delete_batch(&self, handles: &[ReceiptHandle]) -> Result<DeleteOutcome> {
        self.delete_messages(handles).await
    }
}
