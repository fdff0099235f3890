//! Request/response dispatch handler.
//!
//! Routes incoming protocol requests to the availability path or the
//! booking coordinator and produces responses.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use slotbook_core::{TimeWindow, compute_free_slots};
use slotbook_gateway::CalendarGateway;
use slotbook_protocol::{Envelope, ErrorCode, Request, Response};

use crate::config::ServerConfig;
use crate::coordinator::{BookingCoordinator, BookingOutcome, BookingRequest};
use crate::error::{ServerError, ServerResult};
use crate::notify::Notifier;
use crate::reservations::ReservationTable;
use crate::socket::Connection;

/// Server state shared across all connections.
pub struct ServerState {
    config: ServerConfig,
    gateway: Arc<dyn CalendarGateway>,
    coordinator: BookingCoordinator,
    shutdown_requested: bool,
}

impl ServerState {
    /// Creates the server state around a gateway.
    pub fn new(
        config: ServerConfig,
        gateway: Arc<dyn CalendarGateway>,
        notifier: Option<Arc<Notifier>>,
    ) -> Self {
        let coordinator = BookingCoordinator::new(
            gateway.clone(),
            ReservationTable::new(config.reservation_ttl),
            config.policy.slot_minutes,
            config.max_duration_minutes,
            notifier,
        );
        Self {
            config,
            gateway,
            coordinator,
            shutdown_requested: false,
        }
    }

    /// Creates the state already wrapped for sharing across connections.
    pub fn shared(
        config: ServerConfig,
        gateway: Arc<dyn CalendarGateway>,
        notifier: Option<Arc<Notifier>>,
    ) -> SharedState {
        Arc::new(RwLock::new(Self::new(config, gateway, notifier)))
    }

    /// Requests a shutdown.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    /// Returns true if shutdown has been requested.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }
}

/// Shared server state wrapped in an Arc<RwLock>.
pub type SharedState = Arc<RwLock<ServerState>>;

/// Request handler that processes incoming requests and produces responses.
pub struct RequestHandler {
    state: SharedState,
}

impl RequestHandler {
    /// Creates a new request handler with the given state.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Handles one enveloped request, rejecting incompatible protocol
    /// versions before dispatch.
    pub async fn handle_envelope(&self, envelope: &Envelope<Request>) -> Response {
        if !envelope.is_compatible() {
            warn!(
                version = %envelope.protocol_version,
                "rejecting request with incompatible protocol version"
            );
            return Response::error(
                ErrorCode::BadRequest,
                format!("unsupported protocol version {}", envelope.protocol_version),
            );
        }
        self.handle(&envelope.payload).await
    }

    /// Handles a single request and returns the response.
    #[tracing::instrument(skip(self, request), fields(request_type))]
    pub async fn handle(&self, request: &Request) -> Response {
        use tracing::Span;

        let start = std::time::Instant::now();
        Span::current().record("request_type", request.kind());

        let response = match request {
            Request::Ping => {
                debug!("Handling Ping request");
                Response::Pong
            }
            Request::GetAvailability { date, timezone } => {
                debug!(date = %date, "Handling GetAvailability request");
                self.get_availability(*date, timezone.as_deref()).await
            }
            Request::Book {
                form,
                slot_start,
                duration_minutes,
            } => {
                debug!(slot_start = %slot_start, email = %form.email, "Handling Book request");
                let booking = BookingRequest {
                    form: form.clone(),
                    slot_start: *slot_start,
                    duration_minutes: *duration_minutes,
                };
                let state = self.state.read().await;
                match state.coordinator.attempt_booking(&booking, Utc::now()).await {
                    BookingOutcome::Confirmed(reference) => {
                        Response::booked(reference.event_id, reference.html_link)
                    }
                    BookingOutcome::Conflict => Response::SlotTaken,
                    BookingOutcome::Invalid(reason) => Response::invalid(reason),
                    BookingOutcome::UpstreamFailure => Response::unavailable(),
                }
            }
            Request::Shutdown => {
                info!("Handling Shutdown request");
                let mut state = self.state.write().await;
                state.request_shutdown();
                Response::Ok
            }
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(duration_ms = start.elapsed().as_millis(), "Request handled");
        }

        response
    }

    async fn get_availability(&self, date: NaiveDate, timezone: Option<&str>) -> Response {
        // The slots come back as UTC instants; the caller zone is only
        // validated here so a misconfigured bridge fails loudly instead of
        // rendering wrong local times.
        if let Some(tz) = timezone
            && tz.parse::<chrono_tz::Tz>().is_err()
        {
            return Response::invalid(format!("unknown time zone: {}", tz));
        }

        let state = self.state.read().await;
        let window = TimeWindow::new(
            state.config.policy.window_start(date),
            state.config.policy.window_end(date),
        );
        let busy = match state.gateway.query_busy(window).await {
            Ok(busy) => busy,
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "free/busy query failed");
                return Response::unavailable();
            }
            Err(e) => {
                warn!(error = %e, "free/busy query failed permanently");
                return Response::error(ErrorCode::UpstreamError, e.to_string());
            }
        };

        let slots = compute_free_slots(&state.config.policy, date, &busy, Utc::now());
        debug!(slot_count = slots.len(), "Returning availability");
        Response::availability(slots)
    }

    /// Handles a connection, processing all requests until the connection closes.
    pub async fn handle_connection(&self, mut conn: Connection) -> ServerResult<()> {
        loop {
            match conn.read_request().await {
                Ok(Some(envelope)) => {
                    let response = self.handle_envelope(&envelope).await;
                    conn.respond(&envelope.request_id, response).await?;

                    if self.state.read().await.shutdown_requested() {
                        return Err(ServerError::Shutdown);
                    }
                }
                Ok(None) => {
                    debug!("Client disconnected");
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "Error reading request");
                    return Err(e);
                }
            }
        }
    }
}

/// Creates a connection handler function for use with SocketServer::run.
pub fn make_connection_handler(
    state: SharedState,
) -> impl Fn(Connection) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
+ Send
+ Sync
+ 'static {
    move |conn| {
        let handler = RequestHandler::new(state.clone());
        Box::pin(async move {
            if let Err(e) = handler.handle_connection(conn).await
                && !matches!(e, ServerError::Shutdown)
            {
                warn!(error = %e, "Connection handler error");
            }
        })
    }
}
