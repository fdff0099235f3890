//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use slotbook_core::{BusinessHoursPolicy, PolicyError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the Unix socket.
    pub socket_path: PathBuf,

    /// Connection timeout.
    pub connection_timeout: Duration,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Whether to remove stale socket on startup.
    pub cleanup_stale_socket: bool,

    /// Business-hours policy used for availability and validation.
    pub policy: BusinessHoursPolicy,

    /// Upper bound for the booking duration override, in minutes.
    pub max_duration_minutes: u32,

    /// How long an in-flight reservation survives if its attempt never
    /// resolves (crash-safety bound).
    pub reservation_ttl: Duration,

    /// Webhook URL notified on confirmed bookings, if any.
    pub notify_webhook: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            connection_timeout: Duration::from_secs(30),
            max_connections: 100,
            cleanup_stale_socket: true,
            policy: default_policy(),
            max_duration_minutes: 120,
            reservation_ttl: Duration::from_secs(10),
            notify_webhook: None,
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration with the given socket path.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            ..Default::default()
        }
    }

    /// Loads policy settings from the environment, keeping defaults for
    /// anything unset.
    ///
    /// Reads `BUSINESS_TZ`, `WORK_HOURS` (`"HH:MM-HH:MM"`), `SLOT_MINUTES`,
    /// `MAX_DURATION_MINUTES` and `BOOKING_WEBHOOK_URL`.
    pub fn from_env() -> Result<Self, PolicyError> {
        let tz = std::env::var("BUSINESS_TZ").unwrap_or_else(|_| "Australia/Melbourne".to_string());
        let hours = std::env::var("WORK_HOURS").unwrap_or_else(|_| "09:00-17:00".to_string());
        let slot_minutes = std::env::var("SLOT_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let mut config = Self {
            policy: BusinessHoursPolicy::parse(&tz, &hours, slot_minutes)?,
            ..Default::default()
        };
        if let Some(max) = std::env::var("MAX_DURATION_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_duration_minutes = max;
        }
        config.notify_webhook = std::env::var("BOOKING_WEBHOOK_URL").ok();
        Ok(config)
    }

    /// Builder: set connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Builder: set max connections.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Builder: set cleanup stale socket.
    pub fn with_cleanup_stale_socket(mut self, cleanup: bool) -> Self {
        self.cleanup_stale_socket = cleanup;
        self
    }

    /// Builder: set the business-hours policy.
    pub fn with_policy(mut self, policy: BusinessHoursPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder: set the reservation TTL.
    pub fn with_reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }
}

/// The deployment's historical defaults.
fn default_policy() -> BusinessHoursPolicy {
    BusinessHoursPolicy::parse("Australia/Melbourne", "09:00-17:00", 30)
        .expect("default policy is valid")
}

/// Returns the default socket path.
///
/// Uses `$XDG_RUNTIME_DIR/slotbook.sock` if available,
/// otherwise falls back to `/tmp/slotbook-$UID.sock`.
pub fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("slotbook.sock")
    } else {
        #[cfg(unix)]
        let uid = unsafe { libc::getuid() };
        #[cfg(not(unix))]
        let uid = 0;
        PathBuf::from(format!("/tmp/slotbook-{}.sock", uid))
    }
}
