//! Length-prefixed message framing for IPC.
//!
//! Messages are framed with a 4-byte big-endian length prefix followed by
//! the JSON payload:
//!
//! ```text
//! +----------------+------------------+
//! | length (4 BE)  |  JSON payload    |
//! +----------------+------------------+
//! ```
//!
//! The async server connection frames its reads and writes directly on the
//! socket; these functions are the shared codec for both sides.

use serde::{Serialize, de::DeserializeOwned};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a message to bytes with length prefix.
///
/// Returns the complete framed message ready for transmission.
pub fn encode_message<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(message)?;
    let len = json.len() as u32;

    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buffer = Vec::with_capacity(4 + json.len());
    buffer.extend_from_slice(&len.to_be_bytes());
    buffer.extend_from_slice(&json);
    Ok(buffer)
}

/// Decodes a message from bytes with length prefix.
///
/// The input should be a complete framed message (length prefix + payload).
pub fn decode_message<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
    if data.len() < 4 {
        return Err(ProtocolError::IncompleteMessage {
            expected: 4,
            received: data.len(),
        });
    }

    let len_bytes: [u8; 4] = data[0..4].try_into().expect("slice length checked");
    let len = u32::from_be_bytes(len_bytes) as usize;

    if len > MAX_MESSAGE_SIZE as usize {
        return Err(ProtocolError::MessageTooLarge {
            size: len as u32,
            max: MAX_MESSAGE_SIZE,
        });
    }

    if data.len() < 4 + len {
        return Err(ProtocolError::IncompleteMessage {
            expected: 4 + len,
            received: data.len(),
        });
    }

    let json = &data[4..4 + len];
    let message = serde_json::from_slice(json)?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Envelope, Request, Response};

    #[test]
    fn encode_decode_roundtrip() {
        let envelope = Envelope::request("req-123", Request::Ping);
        let bytes = encode_message(&envelope).unwrap();

        // Verify length prefix
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(len as usize, bytes.len() - 4);

        let decoded: Envelope<Request> = decode_message(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn response_roundtrip() {
        let envelope = Envelope::response("req-9", Response::SlotTaken);
        let bytes = encode_message(&envelope).unwrap();
        let decoded: Envelope<Response> = decode_message(&bytes).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn decode_incomplete_length() {
        let result: ProtocolResult<Envelope<Request>> = decode_message(&[0, 0]);
        assert!(matches!(
            result,
            Err(ProtocolError::IncompleteMessage { expected: 4, .. })
        ));
    }

    #[test]
    fn decode_incomplete_payload() {
        // Claim 100 bytes but only provide 10
        let mut data = vec![0, 0, 0, 100];
        data.extend_from_slice(&[0u8; 10]);

        let result: ProtocolResult<Envelope<Request>> = decode_message(&data);
        assert!(matches!(
            result,
            Err(ProtocolError::IncompleteMessage { .. })
        ));
    }

    #[test]
    fn message_too_large() {
        let huge_len = MAX_MESSAGE_SIZE + 1;
        let data = huge_len.to_be_bytes();

        let result: ProtocolResult<Envelope<Request>> = decode_message(&data);
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }
}
