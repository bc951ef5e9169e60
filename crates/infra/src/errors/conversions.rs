//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use routesync_domain::RouteSyncError;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RouteSyncError);

impl From<InfraError> for RouteSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<RouteSyncError> for InfraError {
    fn from(value: RouteSyncError) -> Self {
        InfraError(value)
    }
}

impl std::fmt::Display for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for InfraError {}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoRouteSyncError {
    fn into_route_sync(self) -> RouteSyncError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RouteSyncError */
/* -------------------------------------------------------------------------- */

impl IntoRouteSyncError for HttpError {
    fn into_route_sync(self) -> RouteSyncError {
        if self.is_timeout() {
            return RouteSyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return RouteSyncError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return RouteSyncError::Network(format!(
                "malformed HTTP response body: {}",
                self.without_url()
            ));
        }

        // The URL may carry credentials in its path or query.
        RouteSyncError::Network(self.without_url().to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_route_sync())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → RouteSyncError */
/* -------------------------------------------------------------------------- */

impl IntoRouteSyncError for JsonError {
    fn into_route_sync(self) -> RouteSyncError {
        use serde_json::error::Category;

        let kind = match self.classify() {
            Category::Io => "I/O",
            Category::Syntax => "syntax",
            Category::Data => "data",
            Category::Eof => "truncated",
        };
        RouteSyncError::Internal(format!("JSON {kind} error: {self}"))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_route_sync())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
