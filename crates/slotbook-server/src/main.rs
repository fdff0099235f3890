//! Booking daemon entry point.
//!
//! Starts the Unix socket server in the foreground, wired to the Google
//! Calendar gateway. Configuration comes from the environment; see
//! `ServerConfig::from_env` and `GoogleConfig::from_env` for the variables
//! read. Blocks until SIGTERM or SIGINT.

use std::sync::Arc;

use tracing::info;

use slotbook_core::{TracingConfig, init_tracing};
use slotbook_gateway::{GoogleCalendarGateway, GoogleConfig};
use slotbook_server::{
    Notifier, ServerConfig, ServerState, SignalHandler, SocketServer, make_connection_handler,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(TracingConfig::daemon())?;

    let config = ServerConfig::from_env()?;
    info!(
        socket = %config.socket_path.display(),
        timezone = %config.policy.tz,
        slot_minutes = config.policy.slot_minutes,
        "Starting booking daemon"
    );

    let google_config = GoogleConfig::from_env()?;
    let gateway = Arc::new(GoogleCalendarGateway::new(google_config)?);

    let notifier = match config.notify_webhook.as_deref() {
        Some(url) => {
            info!(url = %url, "Booking webhook enabled");
            Some(Arc::new(Notifier::new(url)?))
        }
        None => None,
    };

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();

    let state = ServerState::shared(config.clone(), gateway, notifier);
    let server = SocketServer::new(config).await?;
    info!(path = %server.socket_path().display(), "Server listening");

    let handler = make_connection_handler(state);
    let shutdown = signal_handler.shutdown();
    server.run_until_shutdown(handler, shutdown.wait()).await?;

    info!("Server stopped");
    Ok(())
}
