//! TMS response shapes

use serde::Deserialize;

/// Body returned by the login endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub token: String,
}
