//! TMS job and route types

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::errors::RouteSyncError;

/// Operating company identifier.
///
/// Opcos partition the sync: routes never merge across two opcos.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpcoId(String);

impl OpcoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpcoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OpcoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OpcoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Route lifecycle status as understood by the TMS query template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteStatus {
    NotStarted,
    InProgress,
    Complete,
}

impl RouteStatus {
    /// Statuses synchronised when none are configured.
    pub const DEFAULT_SET: [RouteStatus; 3] =
        [RouteStatus::NotStarted, RouteStatus::InProgress, RouteStatus::Complete];

    /// Wire name used in the `routeStatuses` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::InProgress => "InProgress",
            Self::Complete => "Complete",
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteStatus {
    type Err = RouteSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String =
            s.chars().filter(|c| !matches!(c, '_' | '-' | ' ')).collect::<String>();
        match normalized.to_ascii_lowercase().as_str() {
            "notstarted" => Ok(Self::NotStarted),
            "inprogress" => Ok(Self::InProgress),
            "complete" | "completed" => Ok(Self::Complete),
            _ => Err(RouteSyncError::Config(format!("Unknown route status: {s}"))),
        }
    }
}

/// Retrieval window for one opco.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    pub opco_id: OpcoId,
    pub from_date: NaiveDate,
    pub route_statuses: Vec<RouteStatus>,
}

impl JobQuery {
    pub fn new(opco_id: OpcoId, from_date: NaiveDate, route_statuses: Vec<RouteStatus>) -> Self {
        Self { opco_id, from_date, route_statuses }
    }

    /// Statuses joined with commas, in configured order.
    pub fn route_status_csv(&self) -> String {
        self.route_statuses.iter().map(RouteStatus::as_str).collect::<Vec<_>>().join(",")
    }

    /// `from_date` formatted as `YYYY-MM-DD`.
    pub fn from_date_param(&self) -> String {
        self.from_date.format("%Y-%m-%d").to_string()
    }
}

/// Raw job row returned by the TMS.
///
/// Only `RouteId` is interpreted; every other column is carried through
/// untouched in `attributes` and re-emitted on serialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireJobRecord", into = "WireJobRecord")]
pub struct JobRecord {
    /// `RouteId` as text; numeric ids are rendered in decimal for grouping
    pub route_id: String,
    pub attributes: Map<String, Value>,
    /// Set when the TMS sent `RouteId` as a number, so it is re-emitted as one
    numeric_route_id: Option<Number>,
}

impl JobRecord {
    pub fn new(route_id: impl Into<String>) -> Self {
        Self { route_id: route_id.into(), attributes: Map::new(), numeric_route_id: None }
    }

    /// Builder-style helper for attaching an opaque TMS column.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Row shape as the TMS sends it
#[derive(Serialize, Deserialize)]
struct WireJobRecord {
    #[serde(rename = "RouteId")]
    route_id: Value,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

// The TMS is not consistent about numeric vs textual route identifiers.
impl TryFrom<WireJobRecord> for JobRecord {
    type Error = String;

    fn try_from(wire: WireJobRecord) -> Result<Self, Self::Error> {
        let (route_id, numeric_route_id) = match wire.route_id {
            Value::String(s) => (s, None),
            Value::Number(n) => (n.to_string(), Some(n)),
            other => return Err(format!("RouteId must be a string or number, got {other}")),
        };
        Ok(Self { route_id, attributes: wire.attributes, numeric_route_id })
    }
}

impl From<JobRecord> for WireJobRecord {
    fn from(job: JobRecord) -> Self {
        let route_id = match job.numeric_route_id {
            Some(n) if n.to_string() == job.route_id => Value::Number(n),
            _ => Value::String(job.route_id),
        };
        Self { route_id, attributes: job.attributes }
    }
}

/// Jobs sharing one route identifier.
///
/// `jobs` is never empty and keeps the order the TMS returned them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub route_id: String,
    pub jobs: Vec<JobRecord>,
}

impl Route {
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}
