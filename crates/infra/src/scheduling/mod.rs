//! Scheduling infrastructure for recurring sync and drain cycles
//!
//! The scheduler follows the same runtime rules throughout:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on all async operations
//! - Structured tracing of every run with its iteration number and duration

pub mod cron_scheduler;
pub mod error;
pub mod jobs;

pub use cron_scheduler::{CronScheduler, CronSchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
pub use jobs::{DrainJob, ScheduledJob, SyncJob};
