//! # RouteSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the TMS, token store and queue
//! - Route aggregation
//! - Sync orchestration and the queue drain cycle
//!
//! ## Architecture Principles
//! - Only depends on `routesync-domain`
//! - No HTTP or queue protocol code
//! - All external dependencies via traits

pub mod queue;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use queue::ports::MessageQueue;
pub use queue::{DrainReport, QueueDrainer};
pub use sync::ports::{JobSource, RoutePublisher, TokenStore};
pub use sync::{group, OpcoSyncReport, SyncPhase, SyncReport, SyncService};
