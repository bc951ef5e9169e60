//! Route synchronisation: TMS jobs → routes → queue

pub mod aggregator;
pub mod ports;
pub mod service;

pub use aggregator::group;
pub use service::{OpcoSyncReport, SyncPhase, SyncReport, SyncService};
