//! Jobs run by the [`CronScheduler`](super::CronScheduler)

use std::sync::Arc;

use async_trait::async_trait;
use routesync_core::{QueueDrainer, SyncService};

use crate::errors::InfraError;

/// A unit of work triggered on a schedule.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Execute the job once.
    async fn run(&self) -> Result<(), InfraError>;
}

/// One sync cycle across every whitelisted opco.
pub struct SyncJob {
    service: SyncService,
}

impl SyncJob {
    pub fn new(service: SyncService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ScheduledJob for SyncJob {
    fn name(&self) -> &'static str {
        "sync"
    }

    async fn run(&self) -> Result<(), InfraError> {
        self.service.sync_all().await.map(|_| ()).map_err(InfraError::from)
    }
}

/// One drain cycle. Drain failures are logged by the drainer and never fail
/// the job.
pub struct DrainJob {
    drainer: Arc<QueueDrainer>,
}

impl DrainJob {
    pub fn new(drainer: Arc<QueueDrainer>) -> Self {
        Self { drainer }
    }
}

#[async_trait]
impl ScheduledJob for DrainJob {
    fn name(&self) -> &'static str {
        "drain"
    }

    async fn run(&self) -> Result<(), InfraError> {
        self.drainer.drain_cycle().await;
        Ok(())
    }
}
