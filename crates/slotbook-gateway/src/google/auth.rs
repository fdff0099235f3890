//! Access token acquisition from a stored refresh token.
//!
//! Google access tokens live for about an hour. The broker exchanges the
//! configured refresh token for an access token on demand and caches it in
//! memory with a safety buffer before the reported expiry, so steady-state
//! requests pay no extra round trip.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

use super::config::OAuthCredentials;

/// Google's OAuth 2.0 token endpoint.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry.
const EXPIRY_BUFFER_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

/// Exchanges the refresh token for access tokens and caches the result.
pub struct AccessTokenBroker {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    cached: tokio::sync::Mutex<Option<CachedToken>>,
}

impl AccessTokenBroker {
    /// Creates a broker sharing the gateway's HTTP client.
    pub fn new(credentials: OAuthCredentials, http_client: reqwest::Client) -> Self {
        Self {
            credentials,
            http_client,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    /// Returns a valid access token, exchanging the refresh token if the
    /// cached one is missing or about to expire.
    pub async fn access_token(&self) -> GatewayResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && !token.is_expired(Utc::now())
        {
            return Ok(token.access_token.clone());
        }

        let token = self.exchange().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn exchange(&self) -> GatewayResult<CachedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::timeout("token exchange timed out")
                } else {
                    GatewayError::network(format!("token exchange request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            return Err(GatewayError::authentication(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::invalid_response(format!("invalid token response: {}", e))
        })?;

        let expires_at = token_response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_BUFFER_SECS));

        debug!("exchanged refresh token for access token");
        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}
