//! Templated TMS queries

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use routesync_core::{JobSource, TokenStore};
use routesync_domain::constants::TMS_TABLE_FIELD;
use routesync_domain::{AuthToken, JobQuery, JobRecord, Result, RouteSyncError, TmsConfig};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::http::HttpClient;

const MAX_ERROR_BODY_CHARS: usize = 256;

/// Query client for the TMS `execute` endpoint.
pub struct TmsClient {
    http: HttpClient,
    base_url: String,
    template: String,
    tokens: Arc<dyn TokenStore>,
}

impl TmsClient {
    /// Create a client using the configured endpoint, template and timeout.
    ///
    /// # Errors
    /// Returns `RouteSyncError::Config` if the base URL is not a valid URL
    /// or the HTTP client cannot be built.
    pub fn new(config: &TmsConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let http = HttpClient::builder().timeout(config.request_timeout()).build()?;
        Self::with_http_client(config, tokens, http)
    }

    /// Create a client sharing an existing HTTP client.
    ///
    /// # Errors
    /// Returns `RouteSyncError::Config` if the base URL is not a valid URL.
    pub fn with_http_client(
        config: &TmsConfig,
        tokens: Arc<dyn TokenStore>,
        http: HttpClient,
    ) -> Result<Self> {
        url::Url::parse(&config.base_url).map_err(|err| {
            RouteSyncError::Config(format!("invalid tms.base_url '{}': {err}", config.base_url))
        })?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            template: config.job_template.clone(),
            tokens,
        })
    }

    /// Run the configured template with `params` and return the JSON body.
    ///
    /// A rejected token (HTTP 401) is replaced once and the request reissued
    /// once. Whatever the reissued request returns is final.
    ///
    /// # Errors
    /// - `RouteSyncError::Authentication` if no token can be obtained
    /// - `RouteSyncError::ApiInvocation` for transport failures, non-success
    ///   statuses, a second rejection or an unreadable body
    #[instrument(skip(self, params), fields(template = %self.template))]
    pub async fn invoke(&self, params: &[(&str, String)]) -> Result<Value> {
        let token = self.tokens.get().await?;
        let response = self.execute(params, &token).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::read_body(response).await;
        }

        warn!("TMS rejected token; refreshing and retrying once");
        let fresh = self.tokens.force_refresh(&token).await?;
        let retried = self.execute(params, &fresh).await?;

        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(RouteSyncError::ApiInvocation(
                "TMS rejected the refreshed token".to_string(),
            ));
        }
        Self::read_body(retried).await
    }

    /// Fetch job rows for one opco within the query window.
    ///
    /// # Errors
    /// Same as [`Self::invoke`], plus `RouteSyncError::ApiInvocation` when the
    /// response lacks the `<template>.TableEntry` table.
    #[instrument(skip(self, query), fields(opco = %query.opco_id))]
    pub async fn fetch_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>> {
        let params = [
            ("opco", query.opco_id.to_string()),
            ("from", query.from_date_param()),
            ("routeStatuses", query.route_status_csv()),
        ];

        let body = self.invoke(&params).await?;
        let jobs = extract_jobs(body, &self.template)?;
        info!(jobs = jobs.len(), "Fetched TMS jobs");
        Ok(jobs)
    }

    async fn execute(&self, params: &[(&str, String)], token: &AuthToken) -> Result<Response> {
        let request = self
            .http
            .request(Method::GET, &self.base_url)
            .query(&[("template", self.template.as_str())])
            .query(params)
            .query(&[("auth", token.as_str())]);

        self.http
            .send(request)
            .await
            .map_err(|err| RouteSyncError::ApiInvocation(err.message().to_string()))
    }

    async fn read_body(response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(RouteSyncError::ApiInvocation(format!(
                "TMS returned HTTP {}: {snippet}",
                status.as_u16()
            )));
        }

        debug!(%status, "TMS query succeeded");
        response.json().await.map_err(|err| {
            RouteSyncError::ApiInvocation(format!("malformed TMS response: {}", err.without_url()))
        })
    }
}

/// Pull `body[template].TableEntry` out as job records.
fn extract_jobs(mut body: Value, template: &str) -> Result<Vec<JobRecord>> {
    let table = body
        .get_mut(template)
        .and_then(|section| section.get_mut(TMS_TABLE_FIELD))
        .map(Value::take)
        .ok_or_else(|| {
            RouteSyncError::ApiInvocation(format!(
                "TMS response is missing {template}.{TMS_TABLE_FIELD}"
            ))
        })?;

    serde_json::from_value(table).map_err(|err| {
        RouteSyncError::ApiInvocation(format!("unexpected {TMS_TABLE_FIELD} rows: {err}"))
    })
}

#[async_trait]
impl JobSource for TmsClient {
    async fn fetch_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>> {
        TmsClient::fetch_jobs(self, query).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_rows_under_template_key() {
        let body = json!({
            "Job_Retrieve_All": {
                "TableEntry": [
                    { "RouteId": "A", "JobId": 1 },
                    { "RouteId": 42, "JobId": 2 }
                ]
            }
        });

        let jobs = extract_jobs(body, "Job_Retrieve_All").unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].route_id, "A");
        assert_eq!(jobs[1].route_id, "42");
        assert_eq!(jobs[1].attributes["JobId"], 2);
    }

    #[test]
    fn missing_table_is_api_failure() {
        let err = extract_jobs(json!({ "Job_Retrieve_All": {} }), "Job_Retrieve_All").unwrap_err();
        assert!(matches!(err, RouteSyncError::ApiInvocation(_)));

        let err = extract_jobs(json!({ "Other": { "TableEntry": [] } }), "Job_Retrieve_All")
            .unwrap_err();
        assert!(matches!(err, RouteSyncError::ApiInvocation(_)));
    }

    #[test]
    fn rows_without_route_id_are_rejected() {
        let body = json!({ "T": { "TableEntry": [ { "JobId": 1 } ] } });
        let err = extract_jobs(body, "T").unwrap_err();
        assert!(matches!(err, RouteSyncError::ApiInvocation(_)));
    }
}
