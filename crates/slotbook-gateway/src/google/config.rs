//! Google Calendar adapter configuration.

use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};

/// OAuth 2.0 credentials for Google API access.
///
/// The refresh token is obtained once, out of band (the deployment keeps
/// it in the environment); the adapter only ever exchanges it for access
/// tokens.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
    /// The long-lived refresh token for this calendar account.
    pub refresh_token: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        if self.refresh_token.is_empty() {
            return Err("refresh_token is required");
        }
        Ok(())
    }
}

/// Configuration for the Google Calendar gateway.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// The target calendar identifier.
    pub calendar_id: String,
    /// OAuth credentials.
    pub credentials: OAuthCredentials,
    /// Bound on every upstream request.
    pub timeout: Duration,
    /// Whether event creation asks Google to email the attendee
    /// (`sendUpdates=all`).
    pub send_updates: bool,
}

impl GoogleConfig {
    /// Creates a config with the default timeout.
    pub fn new(calendar_id: impl Into<String>, credentials: OAuthCredentials) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            credentials,
            timeout: Duration::from_secs(10),
            send_updates: true,
        }
    }

    /// Builder: set the upstream request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set whether Google emails the attendee on creation.
    pub fn with_send_updates(mut self, send_updates: bool) -> Self {
        self.send_updates = send_updates;
        self
    }

    /// Loads the config from the environment.
    ///
    /// Reads `GCAL_CALENDAR_ID`, `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`,
    /// `GOOGLE_REFRESH_TOKEN` and optionally `GCAL_TIMEOUT_SECS`.
    pub fn from_env() -> GatewayResult<Self> {
        let calendar_id = require_env("GCAL_CALENDAR_ID")?;
        let credentials = OAuthCredentials::new(
            require_env("GOOGLE_CLIENT_ID")?,
            require_env("GOOGLE_CLIENT_SECRET")?,
            require_env("GOOGLE_REFRESH_TOKEN")?,
        );

        let mut config = Self::new(calendar_id, credentials);
        if let Ok(secs) = std::env::var("GCAL_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                GatewayError::configuration(format!("invalid GCAL_TIMEOUT_SECS: {}", secs))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Validates the whole configuration.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.calendar_id.is_empty() {
            return Err(GatewayError::configuration("calendar_id is required"));
        }
        if self.timeout.is_zero() {
            return Err(GatewayError::configuration("timeout must be non-zero"));
        }
        self.credentials
            .validate()
            .map_err(GatewayError::configuration)
    }
}

fn require_env(name: &str) -> GatewayResult<String> {
    std::env::var(name)
        .map_err(|_| GatewayError::configuration(format!("missing environment variable {}", name)))
}
