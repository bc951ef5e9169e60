//! TMS adapters
//!
//! [`TokenManager`] owns the session token and [`TmsClient`] issues templated
//! queries with it, recovering from exactly one token rejection per call.

mod auth;
mod client;
mod wire;

pub use auth::TokenManager;
pub use client::TmsClient;
