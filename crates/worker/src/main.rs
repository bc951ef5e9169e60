//! RouteSync worker.
//!
//! Run with: `routesync <command>`
//!
//! Help text goes to stdout directly; everything else is structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use routesync_core::{QueueDrainer, SyncService};
use routesync_domain::AppConfig;
use routesync_infra::config;
use routesync_infra::observability::{init_tracing, LogFormat};
use routesync_infra::scheduling::{CronScheduler, CronSchedulerConfig, DrainJob, SyncJob};
use routesync_infra::{QueueClient, TmsClient, TokenManager};
use tracing::{error, info};

/// Wired-up services shared by every command
struct Services {
    config: AppConfig,
    sync: SyncService,
    drainer: Arc<QueueDrainer>,
}

impl Services {
    fn build() -> anyhow::Result<Self> {
        let config = config::load().context("failed to load configuration")?;
        config.validate().context("invalid configuration")?;

        let tokens =
            Arc::new(TokenManager::new(&config.tms).context("failed to build TMS auth client")?);
        let tms =
            Arc::new(TmsClient::new(&config.tms, tokens).context("failed to build TMS client")?);
        let queue =
            Arc::new(QueueClient::new(&config.queue).context("failed to build queue client")?);

        let sync = SyncService::new(tms, queue.clone(), config.sync.clone());
        let drainer = Arc::new(QueueDrainer::new(queue));

        Ok(Self { config, sync, drainer })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Ignoring unreadable .env file: {err}");
        }
    }
    init_tracing(LogFormat::from_env());

    let command = env::args().nth(1);

    let result = match command.as_deref() {
        Some("sync") => run_sync().await,
        Some("drain") => run_drain().await,
        Some("run") => run_scheduled().await,
        Some("help" | "--help" | "-h") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown command: {unknown}");
            eprintln!();
            print_help();
            Err(anyhow::anyhow!("Unknown command"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{e:#}"), "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("RouteSync worker");
    println!();
    println!("USAGE:");
    println!("    routesync <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    sync      Run one sync cycle across every whitelisted opco");
    println!("    drain     Receive one batch from the route queue and delete it");
    println!("    run       Schedule sync (and optional drain) cycles until Ctrl-C");
    println!("    help      Show this help message");
    println!();
    println!("Configuration is read from the environment (a .env file is honoured),");
    println!("falling back to config.json / config.toml in the working directory.");
}

/// One sync cycle; a failing opco fails the command.
async fn run_sync() -> anyhow::Result<()> {
    let services = Services::build()?;
    let report = services.sync.sync_all().await.context("sync cycle failed")?;
    info!(
        cycle_id = %report.cycle_id,
        routes = report.total_routes(),
        jobs = report.total_jobs(),
        "Sync finished"
    );
    Ok(())
}

/// One drain cycle; queue errors are logged, never fatal.
async fn run_drain() -> anyhow::Result<()> {
    let services = Services::build()?;
    let report = services.drainer.drain_cycle().await;
    info!(
        received = report.received,
        deleted = report.deleted,
        failed = report.failed,
        clean = report.is_clean(),
        "Drain finished"
    );
    Ok(())
}

async fn run_scheduled() -> anyhow::Result<()> {
    let services = Services::build()?;
    let schedule = &services.config.schedule;

    let mut scheduler = CronScheduler::new(CronSchedulerConfig::from_schedule(schedule)).await?;
    scheduler.add_job(&schedule.sync_cron, Arc::new(SyncJob::new(services.sync.clone()))).await?;
    if let Some(drain_cron) = &schedule.drain_cron {
        scheduler.add_job(drain_cron, Arc::new(DrainJob::new(services.drainer.clone()))).await?;
    }

    scheduler.start().await?;
    info!(sync_cron = %schedule.sync_cron, drain_cron = ?schedule.drain_cron, "Worker running");

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    scheduler.stop().await?;
    Ok(())
}
