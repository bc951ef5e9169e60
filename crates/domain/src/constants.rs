//! Application constants
//!
//! Centralized location for defaults shared by configuration and adapters.

// TMS
pub const DEFAULT_TMS_URL: &str = "https://sysco.api.telogis.com/execute";
pub const DEFAULT_TMS_AUTH_URL: &str = "https://sysco.api.telogis.com/rest/login/sysco";
pub const DEFAULT_TMS_TIMEOUT_MS: u64 = 100_000;
pub const DEFAULT_JOB_TEMPLATE: &str = "Job_Retrieve_All";
pub const TMS_TABLE_FIELD: &str = "TableEntry";

// Queue
pub const DEFAULT_QUEUE_MAX_MESSAGES: u32 = 10;
pub const MAX_QUEUE_MAX_MESSAGES: u32 = 10;
pub const MAX_QUEUE_WAIT_SECONDS: u32 = 20;
pub const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 30_000;
/// Entries accepted by one send or delete batch call
pub const QUEUE_BATCH_LIMIT: usize = 10;

// Scheduling
pub const DEFAULT_SYNC_CRON: &str = "0 */1 * * * *";
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;
