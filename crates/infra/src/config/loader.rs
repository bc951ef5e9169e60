//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `TMS_USERNAME`, `TMS_PASSWORD`: TMS credentials
//! - `ROUTESYNC_QUEUE_ENDPOINT`: queue service endpoint
//! - `ROUTESYNC_QUEUE_URL`: queue identifier
//! - `ROUTESYNC_OPCO_WHITELIST`: comma-separated opco ids
//! - `ROUTESYNC_FROM_DATE`: retrieval window start (`YYYY-MM-DD`)
//!
//! Optional (defaults in `routesync_domain::constants`):
//! - `TMS_BASE_URL`, `TMS_AUTH_URL`, `TMS_TIMEOUT_MS`, `TMS_JOB_TEMPLATE`
//! - `ROUTESYNC_QUEUE_MAX_MESSAGES`, `ROUTESYNC_QUEUE_WAIT_SECONDS`,
//!   `ROUTESYNC_QUEUE_TIMEOUT_MS`
//! - `ROUTESYNC_ROUTE_STATUSES`: comma-separated statuses
//! - `ROUTESYNC_SYNC_CRON`, `ROUTESYNC_DRAIN_CRON`, `ROUTESYNC_JOB_TIMEOUT_SECS`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./routesync.json` or `./routesync.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use routesync_domain::constants::{
    DEFAULT_JOB_TEMPLATE, DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_QUEUE_MAX_MESSAGES,
    DEFAULT_QUEUE_TIMEOUT_MS, DEFAULT_SYNC_CRON, DEFAULT_TMS_AUTH_URL, DEFAULT_TMS_TIMEOUT_MS,
    DEFAULT_TMS_URL,
};
use routesync_domain::{
    AppConfig, OpcoId, QueueConfig, Result, RouteStatus, RouteSyncError, ScheduleConfig,
    SyncSettings, TmsConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `RouteSyncError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<AppConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `RouteSyncError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<AppConfig> {
    let tms = TmsConfig {
        base_url: env_or("TMS_BASE_URL", DEFAULT_TMS_URL),
        auth_url: env_or("TMS_AUTH_URL", DEFAULT_TMS_AUTH_URL),
        username: env_var("TMS_USERNAME")?,
        password: env_var("TMS_PASSWORD")?,
        request_timeout_ms: env_parse("TMS_TIMEOUT_MS")?.unwrap_or(DEFAULT_TMS_TIMEOUT_MS),
        job_template: env_or("TMS_JOB_TEMPLATE", DEFAULT_JOB_TEMPLATE),
    };

    let queue = QueueConfig {
        endpoint: env_var("ROUTESYNC_QUEUE_ENDPOINT")?,
        queue_url: env_var("ROUTESYNC_QUEUE_URL")?,
        max_messages: env_parse("ROUTESYNC_QUEUE_MAX_MESSAGES")?
            .unwrap_or(DEFAULT_QUEUE_MAX_MESSAGES),
        wait_time_seconds: env_parse("ROUTESYNC_QUEUE_WAIT_SECONDS")?.unwrap_or(0),
        request_timeout_ms: env_parse("ROUTESYNC_QUEUE_TIMEOUT_MS")?
            .unwrap_or(DEFAULT_QUEUE_TIMEOUT_MS),
    };

    let whitelist = env_list(&env_var("ROUTESYNC_OPCO_WHITELIST")?);
    let from_date = parse_date(&env_var("ROUTESYNC_FROM_DATE")?)?;
    let route_statuses = match env_opt("ROUTESYNC_ROUTE_STATUSES") {
        Some(raw) => {
            env_list(&raw).iter().map(|s| RouteStatus::from_str(s)).collect::<Result<Vec<_>>>()?
        }
        None => RouteStatus::DEFAULT_SET.to_vec(),
    };

    let sync = SyncSettings {
        opco_whitelist: whitelist.into_iter().map(OpcoId::from).collect(),
        from_date,
        route_statuses,
    };

    let schedule = ScheduleConfig {
        sync_cron: env_or("ROUTESYNC_SYNC_CRON", DEFAULT_SYNC_CRON),
        drain_cron: env_opt("ROUTESYNC_DRAIN_CRON"),
        job_timeout_secs: env_parse("ROUTESYNC_JOB_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_JOB_TIMEOUT_SECS),
    };

    Ok(AppConfig { tms, queue, sync, schedule })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `RouteSyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(RouteSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            RouteSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| RouteSyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RouteSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RouteSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(RouteSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_files(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_files(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_files(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("routesync.json"),
        dir.join("routesync.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `RouteSyncError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        RouteSyncError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Non-blank environment variable, if set
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `RouteSyncError::Config` if the variable is set but unparsable.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| RouteSyncError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Split a comma-separated list, dropping blanks
fn env_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        RouteSyncError::Config(format!("Invalid ROUTESYNC_FROM_DATE '{raw}': {e}"))
    })
}
