//! Sync orchestration - fan a cycle out across whitelisted opcos

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use routesync_domain::{OpcoId, Result, RouteSyncError, SyncSettings};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::aggregator::group;
use super::ports::{JobSource, RoutePublisher};

/// Position of one opco pipeline within a cycle.
///
/// `Idle → FetchingJobs → Aggregating → Publishing → Done`, with any
/// non-terminal phase able to move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Not started
    Idle,
    /// Querying the TMS for the opco's jobs
    FetchingJobs,
    /// Grouping jobs into routes
    Aggregating,
    /// Handing routes to the queue
    Publishing,
    /// Routes accepted by the queue
    Done,
    /// A step failed; the opco is finished for this cycle
    Failed,
}

impl SyncPhase {
    /// `Done` and `Failed` end the cycle for that opco
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(self, next: SyncPhase) -> bool {
        match (self, next) {
            (current, _) if current.is_terminal() => false,
            (_, Self::Failed) => true,
            (Self::Idle, Self::FetchingJobs)
            | (Self::FetchingJobs, Self::Aggregating)
            | (Self::Aggregating, Self::Publishing)
            | (Self::Publishing, Self::Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FetchingJobs => "fetching_jobs",
            Self::Aggregating => "aggregating",
            Self::Publishing => "publishing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one opco pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcoSyncReport {
    /// Opco this pipeline ran for
    pub opco_id: OpcoId,
    /// Last phase reached
    pub phase: SyncPhase,
    /// Job rows returned by the TMS
    pub jobs_fetched: usize,
    /// Routes the queue accepted
    pub routes_published: usize,
    /// Entries the queue rejected individually while accepting the batch
    pub rejected_entries: usize,
}

impl OpcoSyncReport {
    fn new(opco_id: OpcoId) -> Self {
        Self {
            opco_id,
            phase: SyncPhase::Idle,
            jobs_fetched: 0,
            routes_published: 0,
            rejected_entries: 0,
        }
    }

    fn advance(&mut self, next: SyncPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal sync phase transition {} -> {}",
            self.phase,
            next
        );
        debug!(opco = %self.opco_id, from = %self.phase, to = %next, "Sync phase transition");
        self.phase = next;
    }

    fn fail(&mut self, err: &RouteSyncError) {
        let failed_in = self.phase;
        self.advance(SyncPhase::Failed);
        error!(opco = %self.opco_id, phase = %failed_in, error = %err, "Opco sync failed");
    }
}

/// Outcome of a full cycle where every opco succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Correlates the cycle's log lines
    pub cycle_id: Uuid,
    /// One entry per whitelisted opco, in completion order
    pub opcos: Vec<OpcoSyncReport>,
    /// Wall-clock time of the whole cycle
    pub elapsed: Duration,
}

impl SyncReport {
    /// Jobs fetched across every opco
    pub fn total_jobs(&self) -> usize {
        self.opcos.iter().map(|r| r.jobs_fetched).sum()
    }

    /// Routes published across every opco
    pub fn total_routes(&self) -> usize {
        self.opcos.iter().map(|r| r.routes_published).sum()
    }
}

/// Drives sync cycles across the configured opco whitelist
#[derive(Clone)]
pub struct SyncService {
    jobs: Arc<dyn JobSource>,
    publisher: Arc<dyn RoutePublisher>,
    settings: Arc<SyncSettings>,
}

impl SyncService {
    /// Create a new sync service
    pub fn new(
        jobs: Arc<dyn JobSource>,
        publisher: Arc<dyn RoutePublisher>,
        settings: SyncSettings,
    ) -> Self {
        Self { jobs, publisher, settings: Arc::new(settings) }
    }

    /// Run one cycle for every whitelisted opco concurrently.
    ///
    /// Returns as soon as any opco fails. Pipelines already in flight are
    /// not cancelled; they run to completion in the background.
    ///
    /// # Errors
    /// Returns the first opco failure observed.
    #[instrument(skip(self), fields(cycle_id = tracing::field::Empty))]
    pub async fn sync_all(&self) -> Result<SyncReport> {
        let cycle_id = Uuid::now_v7();
        tracing::Span::current().record("cycle_id", tracing::field::display(cycle_id));

        let started = Instant::now();
        let opco_count = self.settings.opco_whitelist.len();
        info!(opcos = opco_count, "Starting sync cycle");

        let mut pending: FuturesUnordered<_> = self
            .settings
            .opco_whitelist
            .iter()
            .cloned()
            .map(|opco_id| {
                let service = self.clone();
                tokio::spawn(async move { service.sync_one(&opco_id).await })
            })
            .collect();

        let mut reports = Vec::with_capacity(opco_count);
        while let Some(joined) = pending.next().await {
            match joined {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(err)) => {
                    warn!(
                        completed = reports.len(),
                        outstanding = pending.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Sync cycle failed; remaining opcos continue in background"
                    );
                    return Err(err);
                }
                Err(join_err) => {
                    return Err(RouteSyncError::Internal(format!(
                        "Opco sync task failed to join: {join_err}"
                    )));
                }
            }
        }

        let report = SyncReport { cycle_id, opcos: reports, elapsed: started.elapsed() };
        info!(
            opcos = report.opcos.len(),
            jobs = report.total_jobs(),
            routes = report.total_routes(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Sync cycle complete"
        );
        Ok(report)
    }

    /// Fetch, aggregate and publish routes for one opco.
    ///
    /// # Errors
    /// Short-circuits on the first failing step.
    #[instrument(skip(self), fields(opco = %opco_id))]
    pub async fn sync_one(&self, opco_id: &OpcoId) -> Result<OpcoSyncReport> {
        let mut report = OpcoSyncReport::new(opco_id.clone());
        let query = self.settings.query_for(opco_id);

        report.advance(SyncPhase::FetchingJobs);
        let jobs = self.jobs.fetch_jobs(&query).await.inspect_err(|err| report.fail(err))?;
        report.jobs_fetched = jobs.len();

        report.advance(SyncPhase::Aggregating);
        let routes = group(jobs);
        debug!(jobs = report.jobs_fetched, routes = routes.len(), "Aggregated jobs into routes");

        report.advance(SyncPhase::Publishing);
        let ack = self.publisher.publish(&routes).await.inspect_err(|err| report.fail(err))?;
        report.routes_published = ack.accepted;
        report.rejected_entries = ack.failed.len();

        report.advance(SyncPhase::Done);
        info!(
            jobs = report.jobs_fetched,
            routes = report.routes_published,
            rejected = report.rejected_entries,
            "Opco sync complete"
        );
        Ok(report)
    }
}
