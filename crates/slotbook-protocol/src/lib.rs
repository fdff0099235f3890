//! IPC framing and request/response types for slotbook.
//!
//! This crate defines Protocol v1 for communication between the booking
//! front-end bridge and the slotbook server over a Unix socket.
//!
//! # Protocol Overview
//!
//! Messages are sent as length-prefixed JSON:
//! - 4 bytes: message length (u32, big-endian)
//! - N bytes: JSON payload
//!
//! # Envelope Structure
//!
//! Every message is wrapped in an [`Envelope`] containing:
//! - `protocol_version`: Always "1" for this version
//! - `request_id`: opaque ID for request/response correlation
//! - `payload`: The actual request or response
//!
//! # Example
//!
//! ```rust
//! use slotbook_protocol::{Envelope, Request, encode_message, decode_message};
//!
//! let request = Envelope::request("req-123", Request::Ping);
//! let bytes = encode_message(&request).unwrap();
//! let decoded: Envelope<Request> = decode_message(&bytes).unwrap();
//! ```

mod error;
mod framing;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{decode_message, encode_message};
pub use types::{BookingForm, Envelope, ErrorCode, Request, Response};

/// Protocol version constant.
pub const PROTOCOL_VERSION: &str = "1";

/// Maximum message size (1 MB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;
