//! Port interfaces for the sync pipeline

use async_trait::async_trait;
use routesync_domain::{AuthToken, JobQuery, JobRecord, PublishAck, Result, Route};

/// Source of TMS job records for one retrieval window
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Fetch every job matching the query, in TMS order
    async fn fetch_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>>;
}

/// Destination for aggregated routes
#[async_trait]
pub trait RoutePublisher: Send + Sync {
    /// Hand a batch of routes to the queue service.
    ///
    /// Succeeds once the queue has accepted the batch; no retry happens here.
    async fn publish(&self, routes: &[Route]) -> Result<PublishAck>;
}

/// Holder of the TMS credential shared by every concurrent query
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Return the cached token, authenticating first if none is cached
    async fn get(&self) -> Result<AuthToken>;

    /// Replace a token the TMS just rejected.
    ///
    /// Implementations may hand back a newer token obtained by a concurrent
    /// caller instead of authenticating again.
    async fn force_refresh(&self, rejected: &AuthToken) -> Result<AuthToken>;
}
