//! TMS session token management

use async_trait::async_trait;
use reqwest::Method;
use routesync_core::TokenStore;
use routesync_domain::{AuthToken, Result, RouteSyncError, TmsConfig};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use super::wire::AuthResponse;
use crate::http::HttpClient;

/// Caches the TMS token for the life of the process.
///
/// The token carries no local expiry; it is replaced only when a downstream
/// call is rejected. Authentication is serialised behind `refresh_lock`, so
/// concurrent callers that find an empty or stale cache share one login.
pub struct TokenManager {
    http: HttpClient,
    auth_url: String,
    username: String,
    password: String,
    cached: RwLock<Option<AuthToken>>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    /// Create a token manager using the configured timeout.
    ///
    /// # Errors
    /// Returns `RouteSyncError::Config` if the HTTP client cannot be built.
    pub fn new(config: &TmsConfig) -> Result<Self> {
        let http = HttpClient::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: &TmsConfig, http: HttpClient) -> Self {
        Self {
            http,
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Currently cached token, if any
    pub async fn cached(&self) -> Option<AuthToken> {
        self.cached.read().await.clone()
    }

    /// Return the cached token, authenticating first if there is none.
    ///
    /// # Errors
    /// Returns `RouteSyncError::Authentication` if login fails.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> Result<AuthToken> {
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.cached().await {
            debug!("Token populated by a concurrent caller");
            return Ok(token);
        }

        self.authenticate_and_store().await
    }

    /// Authenticate unconditionally and overwrite the cache.
    ///
    /// # Errors
    /// Returns `RouteSyncError::Authentication` if login fails. The previous
    /// token, if any, stays cached.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self) -> Result<AuthToken> {
        let _guard = self.refresh_lock.lock().await;
        self.authenticate_and_store().await
    }

    /// Replace `rejected` with a new token.
    ///
    /// When another caller has already replaced it, the newer cached token is
    /// returned without logging in again.
    ///
    /// # Errors
    /// Returns `RouteSyncError::Authentication` if login fails.
    #[instrument(skip_all)]
    pub async fn refresh_if_current(&self, rejected: &AuthToken) -> Result<AuthToken> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(current) = self.cached().await {
            if &current != rejected {
                debug!("Rejected token already replaced; reusing newer token");
                return Ok(current);
            }
        }

        self.authenticate_and_store().await
    }

    async fn authenticate_and_store(&self) -> Result<AuthToken> {
        let token = self.authenticate().await.inspect_err(|err| {
            warn!(error = %err, "TMS authentication failed");
        })?;
        *self.cached.write().await = Some(token.clone());
        info!("TMS token refreshed");
        Ok(token)
    }

    async fn authenticate(&self) -> Result<AuthToken> {
        let url = format!(
            "{}/{}/{}",
            self.auth_url,
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password)
        );

        let response = self
            .http
            .send(self.http.request(Method::GET, &url))
            .await
            .map_err(|err| RouteSyncError::Authentication(err.message().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteSyncError::Authentication(format!(
                "auth endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: AuthResponse = response.json().await.map_err(|err| {
            RouteSyncError::Authentication(format!(
                "malformed auth response: {}",
                err.without_url()
            ))
        })?;

        let token = AuthToken::new(body.token);
        if token.is_empty() {
            return Err(RouteSyncError::Authentication("auth response carried an empty token".into()));
        }
        Ok(token)
    }
}

#[async_trait]
impl TokenStore for TokenManager {
    async fn get(&self) -> Result<AuthToken> {
        self.get_token().await
    }

    async fn force_refresh(&self, rejected: &AuthToken) -> Result<AuthToken> {
        self.refresh_if_current(rejected).await
    }
}
