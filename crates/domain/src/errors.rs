//! Error types used throughout the sync pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification of [`RouteSyncError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// TMS credential could not be obtained
    Authentication,
    /// TMS query failed or returned an unexpected body
    Tms,
    /// Queue service failed during publish, receive or delete
    Queue,
    /// Transport-level failure that never reached a status code
    Network,
    /// Invalid or missing configuration
    Config,
    /// Programming or runtime invariant failure
    Internal,
}

/// Main error type for route synchronisation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum RouteSyncError {
    #[error("TMS authentication failure: {0}")]
    Authentication(String),

    #[error("TMS API invocation failure: {0}")]
    ApiInvocation(String),

    #[error("Queue publish failure: {0}")]
    QueuePublish(String),

    #[error("Queue receive failure: {0}")]
    QueueReceive(String),

    #[error("Queue delete failure: {0}")]
    QueueDelete(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RouteSyncError {
    /// Get the category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::ApiInvocation(_) => ErrorCategory::Tms,
            Self::QueuePublish(_) | Self::QueueReceive(_) | Self::QueueDelete(_) => {
                ErrorCategory::Queue
            }
            Self::Network(_) => ErrorCategory::Network,
            Self::Config(_) => ErrorCategory::Config,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// The message without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Authentication(msg)
            | Self::ApiInvocation(msg)
            | Self::QueuePublish(msg)
            | Self::QueueReceive(msg)
            | Self::QueueDelete(msg)
            | Self::Network(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg,
        }
    }

    /// Whether a later cycle could plausibly succeed without operator action.
    ///
    /// Only used to pick log levels; nothing is retried automatically.
    pub fn is_transient(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Config | ErrorCategory::Internal)
    }
}

/// Result type alias for route sync operations
pub type Result<T> = std::result::Result<T, RouteSyncError>;
