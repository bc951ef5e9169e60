//! Cron-driven scheduler for sync and drain cycles.
//!
//! Join handles are tracked, cancellation is explicit, and every job run and
//! lifecycle step is wrapped in a timeout. A run that is still in flight when
//! its next tick fires is not started twice; the tick is skipped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use routesync_infra::errors::InfraError;
//! use routesync_infra::scheduling::{
//!     CronScheduler, CronSchedulerConfig, ScheduledJob, SchedulerResult,
//! };
//!
//! struct NoopJob;
//!
//! #[async_trait]
//! impl ScheduledJob for NoopJob {
//!     fn name(&self) -> &'static str {
//!         "noop"
//!     }
//!
//!     async fn run(&self) -> Result<(), InfraError> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> SchedulerResult<()> {
//! let mut scheduler = CronScheduler::new(CronSchedulerConfig::default()).await?;
//! scheduler.add_job("0 */1 * * * *", Arc::new(NoopJob)).await?;
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use routesync_domain::ScheduleConfig;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::error::{SchedulerError, SchedulerResult};
use super::jobs::ScheduledJob;

/// Configuration for the cron scheduler.
#[derive(Debug, Clone)]
pub struct CronSchedulerConfig {
    /// Timeout applied to a single job execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for CronSchedulerConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(300),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl CronSchedulerConfig {
    pub fn from_schedule(schedule: &ScheduleConfig) -> Self {
        Self { job_timeout: schedule.job_timeout(), ..Self::default() }
    }
}

/// A job as registered, kept so a stopped scheduler can be rebuilt.
struct Registration {
    cron: String,
    job: Arc<dyn ScheduledJob>,
    /// Survives restarts so iteration numbers keep counting up
    iterations: Arc<AtomicU64>,
    in_flight: Arc<Mutex<()>>,
}

/// Scheduler with explicit lifecycle management.
///
/// `JobScheduler::shutdown` is terminal, so every `start` after a `stop`
/// builds a fresh underlying scheduler and re-adds the registered jobs.
pub struct CronScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: CronSchedulerConfig,
    registrations: Vec<Registration>,
    jobs: Vec<(Uuid, &'static str)>,
    shut_down: bool,
    monitor_handle: Option<JoinHandle<()>>,
    /// Replaced on every start; job runs read the current token.
    cancellation: Arc<RwLock<CancellationToken>>,
}

impl CronScheduler {
    /// Create a scheduler with no jobs registered.
    ///
    /// # Errors
    /// Returns `SchedulerError::CreationFailed` if the underlying scheduler
    /// cannot be created.
    pub async fn new(config: CronSchedulerConfig) -> SchedulerResult<Self> {
        Ok(Self {
            scheduler: Arc::new(RwLock::new(create_raw_scheduler().await?)),
            config,
            registrations: Vec::new(),
            jobs: Vec::new(),
            shut_down: false,
            monitor_handle: None,
            cancellation: Arc::new(RwLock::new(CancellationToken::new())),
        })
    }

    /// Register `job` to run on the six-field `cron_expression`.
    ///
    /// # Errors
    /// Returns `SchedulerError::JobRegistrationFailed` for a malformed
    /// expression or if the scheduler refuses the job.
    pub async fn add_job(
        &mut self,
        cron_expression: &str,
        job: Arc<dyn ScheduledJob>,
    ) -> SchedulerResult<Uuid> {
        let registration = Registration {
            cron: cron_expression.to_string(),
            job,
            iterations: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(Mutex::new(())),
        };

        let job_id = if self.shut_down {
            // Validated now, added to the rebuilt scheduler on the next start.
            self.job_definition(&registration)?;
            Uuid::nil()
        } else {
            self.register(&registration).await?
        };

        let name = registration.job.name();
        self.jobs.push((job_id, name));
        self.registrations.push(registration);
        debug!(job = name, cron = %cron_expression, job_id = %job_id, "Registered scheduled job");
        Ok(job_id)
    }

    fn job_definition(&self, registration: &Registration) -> SchedulerResult<Job> {
        let job = registration.job.clone();
        let name = job.name();
        let iterations = registration.iterations.clone();
        let in_flight = registration.in_flight.clone();
        let cancellation = self.cancellation.clone();
        let job_timeout = self.config.job_timeout;

        Job::new_async(registration.cron.as_str(), move |_id, _lock| {
            let job = job.clone();
            let iterations = iterations.clone();
            let in_flight = in_flight.clone();
            let cancellation = cancellation.clone();

            Box::pin(async move {
                let Ok(_running) = in_flight.try_lock() else {
                    warn!(job = job.name(), "Previous run still in progress; skipping tick");
                    return;
                };

                let iteration = iterations.fetch_add(1, Ordering::SeqCst) + 1;
                let cancel = cancellation.read().await.clone();
                run_once(job.as_ref(), iteration, job_timeout, &cancel).await;
            })
        })
        .map_err(|e| registration_failed(name, &e))
    }

    async fn register(&self, registration: &Registration) -> SchedulerResult<Uuid> {
        let definition = self.job_definition(registration)?;
        let name = registration.job.name();
        self.scheduler
            .read()
            .await
            .add(definition)
            .await
            .map_err(|e| registration_failed(name, &e))
    }

    /// Replace a shut-down scheduler with a fresh one holding every
    /// registered job.
    async fn rebuild(&mut self) -> SchedulerResult<()> {
        *self.scheduler.write().await = create_raw_scheduler().await?;

        let mut jobs = Vec::with_capacity(self.registrations.len());
        for registration in &self.registrations {
            let job_id = self.register(registration).await?;
            jobs.push((job_id, registration.job.name()));
        }

        self.jobs = jobs;
        self.shut_down = false;
        debug!(jobs = self.jobs.len(), "Rebuilt scheduler after shutdown");
        Ok(())
    }

    /// Start the scheduler, spawning the monitoring task.
    ///
    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if already started, or a
    /// start/timeout error from the underlying scheduler.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        if self.shut_down {
            self.rebuild().await?;
        }

        let cancel = CancellationToken::new();
        *self.cancellation.write().await = cancel.clone();

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
        .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        let handle = tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("Scheduler monitor cancelled");
        });

        self.monitor_handle = Some(handle);
        let jobs: Vec<&str> = self.jobs.iter().map(|(_, name)| *name).collect();
        info!(?jobs, "Scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    ///
    /// Runs in flight observe the cancellation and end early.
    ///
    /// # Errors
    /// Returns `SchedulerError::NotRunning` if not started, or a stop,
    /// timeout or join error.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.read().await.cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
        .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;
        self.shut_down = true;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Names of registered jobs, in registration order
    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|(_, name)| *name).collect()
    }
}

async fn create_raw_scheduler() -> SchedulerResult<JobScheduler> {
    JobScheduler::new().await.map_err(|e| SchedulerError::CreationFailed(e.to_string()))
}

fn registration_failed(job: &str, err: &impl std::fmt::Display) -> SchedulerError {
    SchedulerError::JobRegistrationFailed { job: job.to_string(), reason: err.to_string() }
}

/// Execute one run of `job`, logging its outcome and duration.
async fn run_once(
    job: &dyn ScheduledJob,
    iteration: u64,
    timeout: Duration,
    cancel: &CancellationToken,
) {
    let name = job.name();
    let started = Instant::now();
    debug!(job = name, iteration, "Scheduled run starting");

    tokio::select! {
        () = cancel.cancelled() => {
            warn!(job = name, iteration, "Scheduled run cancelled");
        }
        result = tokio::time::timeout(timeout, job.run()) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match result {
                Ok(Ok(())) => info!(job = name, iteration, elapsed_ms, "Scheduled run finished"),
                Ok(Err(err)) if err.0.is_transient() => {
                    warn!(job = name, iteration, elapsed_ms, error = %err, "Scheduled run failed");
                }
                Ok(Err(err)) => {
                    error!(job = name, iteration, elapsed_ms, error = %err, "Scheduled run failed");
                }
                Err(_) => {
                    warn!(job = name, iteration, timeout_secs = timeout.as_secs(), "Scheduled run timed out");
                }
            }
        }
    }
}

impl Drop for CronScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("CronScheduler dropped while running; cancelling tasks");
            if let Ok(token) = self.cancellation.try_read() {
                token.cancel();
            }
        }
    }
}
