//! Configuration structures
//!
//! Read once at process start and passed explicitly into each component.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_JOB_TEMPLATE, DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_QUEUE_MAX_MESSAGES,
    DEFAULT_QUEUE_TIMEOUT_MS, DEFAULT_SYNC_CRON, DEFAULT_TMS_AUTH_URL, DEFAULT_TMS_TIMEOUT_MS,
    DEFAULT_TMS_URL, MAX_QUEUE_MAX_MESSAGES, MAX_QUEUE_WAIT_SECONDS,
};
use crate::errors::{Result, RouteSyncError};
use crate::types::{JobQuery, OpcoId, RouteStatus};

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub tms: TmsConfig,
    pub queue: QueueConfig,
    pub sync: SyncSettings,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    /// Reject configurations that could never complete a cycle.
    ///
    /// # Errors
    /// Returns `RouteSyncError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.tms.validate()?;
        self.queue.validate()?;
        self.sync.validate()?;
        self.schedule.validate()
    }
}

/// TMS endpoints and credentials
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TmsConfig {
    #[serde(default = "default_tms_url")]
    pub base_url: String,
    #[serde(default = "default_tms_auth_url")]
    pub auth_url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_tms_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Query template name; the response table is keyed by the same name.
    #[serde(default = "default_job_template")]
    pub job_template: String,
}

impl TmsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("tms.base_url", &self.base_url)?;
        require_non_empty("tms.auth_url", &self.auth_url)?;
        require_non_empty("tms.username", &self.username)?;
        require_non_empty("tms.password", &self.password)?;
        require_non_empty("tms.job_template", &self.job_template)?;
        require_positive("tms.request_timeout_ms", self.request_timeout_ms)
    }
}

impl fmt::Debug for TmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmsConfig")
            .field("base_url", &self.base_url)
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("job_template", &self.job_template)
            .finish()
    }
}

/// Queue service endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Service endpoint receiving the JSON protocol calls
    pub endpoint: String,
    /// Queue identifier passed in every call
    pub queue_url: String,
    #[serde(default = "default_queue_max_messages")]
    pub max_messages: u32,
    #[serde(default)]
    pub wait_time_seconds: u32,
    #[serde(default = "default_queue_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl QueueConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("queue.endpoint", &self.endpoint)?;
        require_non_empty("queue.queue_url", &self.queue_url)?;
        require_positive("queue.request_timeout_ms", self.request_timeout_ms)?;
        if self.max_messages == 0 || self.max_messages > MAX_QUEUE_MAX_MESSAGES {
            return Err(RouteSyncError::Config(format!(
                "queue.max_messages must be between 1 and {MAX_QUEUE_MAX_MESSAGES}, got {}",
                self.max_messages
            )));
        }
        if self.wait_time_seconds > MAX_QUEUE_WAIT_SECONDS {
            return Err(RouteSyncError::Config(format!(
                "queue.wait_time_seconds must be at most {MAX_QUEUE_WAIT_SECONDS}, got {}",
                self.wait_time_seconds
            )));
        }
        Ok(())
    }
}

/// What to synchronise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub opco_whitelist: Vec<OpcoId>,
    pub from_date: NaiveDate,
    #[serde(default = "default_route_statuses")]
    pub route_statuses: Vec<RouteStatus>,
}

impl SyncSettings {
    /// Query for one opco using the configured window.
    pub fn query_for(&self, opco_id: &OpcoId) -> JobQuery {
        JobQuery::new(opco_id.clone(), self.from_date, self.route_statuses.clone())
    }

    fn validate(&self) -> Result<()> {
        if self.opco_whitelist.is_empty() {
            return Err(RouteSyncError::Config("sync.opco_whitelist must not be empty".into()));
        }
        if self.opco_whitelist.iter().any(|opco| opco.as_str().trim().is_empty()) {
            return Err(RouteSyncError::Config(
                "sync.opco_whitelist contains an empty opco id".into(),
            ));
        }
        if self.route_statuses.is_empty() {
            return Err(RouteSyncError::Config("sync.route_statuses must not be empty".into()));
        }
        Ok(())
    }
}

/// When the worker runs cycles in `run` mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Six-field cron expression (seconds first)
    #[serde(default = "default_sync_cron")]
    pub sync_cron: String,
    /// Drain cycles are only scheduled when set
    #[serde(default)]
    pub drain_cron: Option<String>,
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

impl ScheduleConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("schedule.sync_cron", &self.sync_cron)?;
        if let Some(drain) = &self.drain_cron {
            require_non_empty("schedule.drain_cron", drain)?;
        }
        require_positive("schedule.job_timeout_secs", self.job_timeout_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sync_cron: default_sync_cron(),
            drain_cron: None,
            job_timeout_secs: default_job_timeout_secs(),
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RouteSyncError::Config(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(RouteSyncError::Config(format!("{field} must be greater than zero")));
    }
    Ok(())
}

fn default_tms_url() -> String {
    DEFAULT_TMS_URL.to_string()
}

fn default_tms_auth_url() -> String {
    DEFAULT_TMS_AUTH_URL.to_string()
}

fn default_tms_timeout_ms() -> u64 {
    DEFAULT_TMS_TIMEOUT_MS
}

fn default_job_template() -> String {
    DEFAULT_JOB_TEMPLATE.to_string()
}

fn default_queue_max_messages() -> u32 {
    DEFAULT_QUEUE_MAX_MESSAGES
}

fn default_queue_timeout_ms() -> u64 {
    DEFAULT_QUEUE_TIMEOUT_MS
}

fn default_route_statuses() -> Vec<RouteStatus> {
    RouteStatus::DEFAULT_SET.to_vec()
}

fn default_sync_cron() -> String {
    DEFAULT_SYNC_CRON.to_string()
}

fn default_job_timeout_secs() -> u64 {
    DEFAULT_JOB_TIMEOUT_SECS
}
