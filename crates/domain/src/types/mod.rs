//! Domain types and models
//!
//! Route data flows TMS → [`JobRecord`] → [`Route`] → queue; queue deliveries
//! come back as [`QueueMessage`] values identified by a [`ReceiptHandle`].

pub mod auth;
pub mod queue;
pub mod route;

pub use auth::AuthToken;
pub use queue::{BatchEntryFailure, DeleteOutcome, PublishAck, QueueMessage, ReceiptHandle};
pub use route::{JobQuery, JobRecord, OpcoId, Route, RouteStatus};
