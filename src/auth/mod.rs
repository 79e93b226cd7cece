//! OAuth2 client-credentials auth client for the upstream tenant API
//!
//! A single mutex guards the cached token and its expiry; refreshes are
//! rare (roughly hourly) so there is no attempt at lock-free cleverness
//! here. The token request itself is a plain form-encoded
//! POST built directly on `reqwest` rather than through the `oauth2`
//! crate's authorization-code-oriented typestate client (see DESIGN.md
//! for the reasoning).

use crate::config::OpsRampConfig;
use crate::error::{GatewayError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Safety margin subtracted from the upstream-reported `expires_in`
/// before caching.
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 60;

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: u64,
}

/// Acquires and caches OAuth2 bearer tokens for the upstream tenant API.
pub struct AuthClient {
    auth_url: String,
    client_id: String,
    client_secret: String,
    http_client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl AuthClient {
    pub fn new(config: &OpsRampConfig) -> Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::config(format!("failed to build auth HTTP client: {e}")))?;

        Ok(Self {
            auth_url: config.auth_url.clone(),
            client_id: config.auth_key.clone(),
            client_secret: config.auth_secret.clone(),
            http_client,
            cached: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, refreshing it under the single mutex
    /// when it is absent or within the safety margin of expiry
    pub async fn get_token(&self) -> Result<String> {
        let mut guard = self.cached.lock().await;

        let now = Utc::now();
        if let Some(cached) = guard.as_ref() {
            if now < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let start = std::time::Instant::now();
        tracing::debug!(url = %self.auth_url, "fetching OAuth2 client-credentials token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.auth_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::auth(format!("token request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::auth(format!("token endpoint returned status {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::auth(format!("token endpoint returned an unparseable body: {e}")))?;

        if token.access_token.is_empty() {
            return Err(GatewayError::auth("token endpoint returned an empty access_token"));
        }

        let expires_at =
            Utc::now() + ChronoDuration::seconds(token.expires_in as i64) - ChronoDuration::seconds(EXPIRY_SAFETY_MARGIN_SECS);

        tracing::info!(
            token_type = token.token_type.as_deref().unwrap_or("bearer"),
            expires_in = token.expires_in,
            duration_ms = start.elapsed().as_millis() as u64,
            "OAuth2 token refreshed"
        );

        let access_token = token.access_token.clone();
        *guard = Some(CachedToken { access_token: token.access_token, expires_at });

        Ok(access_token)
    }
}
