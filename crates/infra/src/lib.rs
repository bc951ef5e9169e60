//! # RouteSync Infrastructure
//!
//! Adapters implementing the ports defined in `routesync-core`.
//!
//! This crate contains:
//! - HTTP client wrapper shared by every outbound call
//! - TMS token management and query client
//! - Queue client speaking the SQS JSON protocol
//! - Configuration loading, cron scheduling and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `routesync-core`
//! - Depends on `routesync-domain` and `routesync-core`
//! - Contains all "impure" code (network, environment, files)

pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod queue;
pub mod scheduling;
pub mod tms;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use queue::QueueClient;
pub use tms::{TmsClient, TokenManager};
