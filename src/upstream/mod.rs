//! Upstream HTTP client: authenticated request construction, logging,
//! retry/backoff, and error classification.

use crate::auth::AuthClient;
use crate::config::OpsRampConfig;
use crate::error::{ErrorKind, GatewayError, Result, UpstreamError};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const MAX_LOGGED_BODY: usize = 1000;

#[derive(Clone, Copy, Debug)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Authenticated HTTP client for the tenant-scoped upstream API.
pub struct UpstreamClient {
    base_url: String,
    tenant_id: String,
    http_client: reqwest::Client,
    auth: AuthClient,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl UpstreamClient {
    pub fn new(config: &OpsRampConfig) -> Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(config.resources.request_timeout.max(60)))
            .build()
            .map_err(|e| GatewayError::config(format!("failed to build upstream HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.tenant_url.trim_end_matches('/').to_string(),
            tenant_id: config.tenant_id.clone(),
            http_client,
            auth: AuthClient::new(config)?,
            retry_attempts: config.resources.retry_attempts.max(1),
            retry_delay: Duration::from_millis(config.resources.retry_delay),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        self.execute(Method::Get, endpoint, None::<&()>).await
    }

    pub async fn post<B: Serialize>(&self, endpoint: &str, body: Option<&B>) -> Result<Value> {
        self.execute(Method::Post, endpoint, body).await
    }

    pub async fn put<B: Serialize>(&self, endpoint: &str, body: Option<&B>) -> Result<Value> {
        self.execute(Method::Put, endpoint, body).await
    }

    pub async fn patch<B: Serialize>(&self, endpoint: &str, body: Option<&B>) -> Result<Value> {
        self.execute(Method::Patch, endpoint, body).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.execute(Method::Delete, endpoint, None::<&()>).await
    }

    /// Join the base URL with `endpoint`, preserving any query string
    /// verbatim rather than re-encoding it.
    fn build_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim_start_matches('/');
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn execute<B: Serialize>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<Value> {
        let url = self.build_url(endpoint);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let start = std::time::Instant::now();
            let outcome = self.try_once(method, &url, body).await;
            let duration = start.elapsed();

            match outcome {
                Ok(value) => {
                    crate::telemetry::record_upstream_request(method.as_str(), "success", duration.as_secs_f64());
                    tracing::debug!(method = method.as_str(), url = %url, duration_ms = duration.as_millis() as u64, "upstream call succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    crate::telemetry::record_upstream_request(method.as_str(), "error", duration.as_secs_f64());
                    let retryable = err.kind.is_retryable();
                    tracing::debug!(
                        method = method.as_str(),
                        url = %url,
                        attempt,
                        retryable,
                        duration_ms = duration.as_millis() as u64,
                        "upstream call failed"
                    );

                    if !retryable || attempt >= self.retry_attempts {
                        return Err(GatewayError::Upstream(err));
                    }

                    let delay = self.retry_delay * attempt;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn try_once<B: Serialize>(&self, method: Method, url: &str, body: Option<&B>) -> std::result::Result<Value, UpstreamError> {
        let token = self
            .auth
            .get_token()
            .await
            .map_err(|e| UpstreamError::new(ErrorKind::Permission, format!("auth failure: {e}")))?;

        let mut request = self
            .http_client
            .request(method.to_reqwest(), url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("X-Tenant-ID", &self.tenant_id);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| UpstreamError::transport(e.to_string()))?;
        let status = response.status();
        let body_text = response.text().await.unwrap_or_default();

        if cfg!(debug_assertions) {
            let truncated: String = body_text.chars().take(MAX_LOGGED_BODY).collect();
            tracing::debug!(status = status.as_u16(), body = %truncated, "upstream response body");
        }

        if !status.is_success() {
            return Err(UpstreamError::from_status(status.as_u16(), body_text));
        }

        if body_text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body_text).map_err(|e| UpstreamError::new(ErrorKind::ServerError, format!("failed to decode upstream JSON body: {e}")))
    }
}

#[cfg(test)]
mod tests;
