//! Booking daemon: availability queries, race-safe booking, notifications.
//!
//! This crate provides the slotbook server that handles:
//! - Unix socket IPC for the front-end bridge
//! - The availability query path (free/busy fetch + slot computation)
//! - The booking coordinator with its in-flight reservation table
//! - Fire-and-forget webhook notifications on confirmed bookings
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use slotbook_gateway::{FailingGateway, GatewayErrorCode};
//! use slotbook_server::{make_connection_handler, ServerConfig, ServerState, SocketServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let gateway = Arc::new(FailingGateway::new(
//!         GatewayErrorCode::ConfigurationError,
//!         "no calendar configured",
//!     ));
//!     let state = ServerState::shared(config.clone(), gateway, None);
//!     let server = SocketServer::new(config).await?;
//!     server.run(make_connection_handler(state)).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod coordinator;
mod error;
mod handler;
mod notify;
mod reservations;
mod signals;
mod socket;

pub use config::{ServerConfig, default_socket_path};
pub use coordinator::{BookingCoordinator, BookingOutcome, BookingRequest};
pub use error::{ServerError, ServerResult};
pub use handler::{RequestHandler, ServerState, SharedState, make_connection_handler};
pub use notify::{BookingNotification, Notifier};
pub use reservations::{ReservationGuard, ReservationTable};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
pub use socket::{Connection, SocketServer};
