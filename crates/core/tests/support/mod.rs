//! Shared test helpers for `routesync-core` integration tests.
//!
//! In-memory mocks for the core ports so tests can focus on orchestration
//! behaviour instead of transport details.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use routesync_core::{JobSource, MessageQueue, RoutePublisher};
use routesync_domain::{
    BatchEntryFailure, DeleteOutcome, JobQuery, JobRecord, OpcoId, PublishAck, QueueMessage,
    ReceiptHandle, Result as DomainResult, Route, RouteStatus, RouteSyncError, SyncSettings,
};

pub fn settings(opcos: &[&str]) -> SyncSettings {
    SyncSettings {
        opco_whitelist: opcos.iter().map(|o| OpcoId::from(*o)).collect(),
        from_date: NaiveDate::from_ymd_opt(2018, 8, 23).unwrap(),
        route_statuses: RouteStatus::DEFAULT_SET.to_vec(),
    }
}

pub fn job(route_id: &str, job_id: u64) -> JobRecord {
    JobRecord::new(route_id).with_attribute("JobId", job_id)
}

/// Scripted TMS: per-opco jobs or failure, with an optional per-opco delay.
#[derive(Default)]
pub struct MockJobSource {
    responses: HashMap<String, DomainResult<Vec<JobRecord>>>,
    delays: HashMap<String, Duration>,
    queries: Mutex<Vec<JobQuery>>,
}

impl MockJobSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(mut self, opco: &str, jobs: Vec<JobRecord>) -> Self {
        self.responses.insert(opco.to_string(), Ok(jobs));
        self
    }

    pub fn with_failure(mut self, opco: &str, err: RouteSyncError) -> Self {
        self.responses.insert(opco.to_string(), Err(err));
        self
    }

    pub fn with_delay(mut self, opco: &str, delay: Duration) -> Self {
        self.delays.insert(opco.to_string(), delay);
        self
    }

    pub fn queries(&self) -> Vec<JobQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobSource for MockJobSource {
    async fn fetch_jobs(&self, query: &JobQuery) -> DomainResult<Vec<JobRecord>> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delays.get(query.opco_id.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        self.responses.get(query.opco_id.as_str()).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Records every published batch; can be told to fail.
#[derive(Default)]
pub struct RecordingPublisher {
    batches: Mutex<Vec<Vec<Route>>>,
    fail_with: Option<RouteSyncError>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(err: RouteSyncError) -> Self {
        Self { batches: Mutex::new(Vec::new()), fail_with: Some(err) }
    }

    pub fn batches(&self) -> Vec<Vec<Route>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoutePublisher for RecordingPublisher {
    async fn publish(&self, routes: &[Route]) -> DomainResult<PublishAck> {
        self.batches.lock().unwrap().push(routes.to_vec());
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(PublishAck { accepted: routes.len(), failed: Vec::new() }),
        }
    }
}

/// Scripted queue consumer side.
pub struct MockQueue {
    receive: DomainResult<Vec<QueueMessage>>,
    failing_handles: Vec<String>,
    delete_error: Option<RouteSyncError>,
    delete_calls: Mutex<Vec<Vec<ReceiptHandle>>>,
}

impl MockQueue {
    pub fn with_messages(handles: &[&str]) -> Self {
        let messages = handles
            .iter()
            .enumerate()
            .map(|(idx, handle)| QueueMessage {
                message_id: Some(format!("msg-{idx}")),
                receipt_handle: ReceiptHandle::new(*handle),
                body: format!("{{\"routeId\":\"R{idx}\",\"jobs\":[]}}"),
            })
            .collect();
        Self {
            receive: Ok(messages),
            failing_handles: Vec::new(),
            delete_error: None,
            delete_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn receive_error(err: RouteSyncError) -> Self {
        Self {
            receive: Err(err),
            failing_handles: Vec::new(),
            delete_error: None,
            delete_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_handle(mut self, handle: &str) -> Self {
        self.failing_handles.push(handle.to_string());
        self
    }

    pub fn delete_error(mut self, err: RouteSyncError) -> Self {
        self.delete_error = Some(err);
        self
    }

    pub fn delete_calls(&self) -> Vec<Vec<ReceiptHandle>> {
        self.delete_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageQueue for MockQueue {
    async fn receive_batch(&self) -> DomainResult<Vec<QueueMessage>> {
        self.receive.clone()
    }

    async fn delete_batch(&self, handles: &[ReceiptHandle]) -> DomainResult<DeleteOutcome> {
        self.delete_calls.lock().unwrap().push(handles.to_vec());
        if let Some(err) = &self.delete_error {
            return Err(err.clone());
        }

        let mut outcome = DeleteOutcome::default();
        for (idx, handle) in handles.iter().enumerate() {
            if self.failing_handles.iter().any(|h| h == handle.as_str()) {
                outcome.failed.push(BatchEntryFailure {
                    id: idx.to_string(),
                    code: "ReceiptHandleIsInvalid".to_string(),
                    message: Some("expired".to_string()),
                    sender_fault: true,
                });
            } else {
                outcome.deleted += 1;
            }
        }
        Ok(outcome)
    }
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
