//! Wire protocol for the context daemon (newline-delimited JSON).
//!
//! One request and one response per connection. Each message is a single
//! JSON object followed by `\n`.

use serde::{Deserialize, Serialize};

use super::ContextError;

/// Message terminator.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Room for the response envelope around the context value.
pub const FRAME_OVERHEAD: usize = 256;

/// Worst-case JSON expansion of one context byte (`\u00XX`).
const ESCAPE_FACTOR: usize = 6;

/// Request sent to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Request {
    /// Ask for the context of one instance.
    GetContext {
        /// Instance name as validated by the caller.
        instance: String,
    },
}

/// Response returned by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Response {
    /// Context found.
    Ok {
        /// Opaque context value.
        context: String,
    },
    /// The daemon has no record for the instance.
    NotFound,
    /// The daemon failed internally.
    Error {
        /// Diagnostic from the daemon.
        message: String,
    },
}

/// Largest response frame accepted for a given context limit.
pub fn max_frame_bytes(max_context_bytes: usize) -> usize {
    max_context_bytes
        .saturating_mul(ESCAPE_FACTOR)
        .saturating_add(FRAME_OVERHEAD)
}

/// Encode a request as one delimited frame.
///
/// # Errors
///
/// Returns [`ContextError::Encode`] if serialization fails.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, ContextError> {
    let mut frame = serde_json::to_vec(request).map_err(ContextError::Encode)?;
    frame.push(FRAME_DELIMITER);
    Ok(frame)
}

/// Decode a response frame with the delimiter already stripped.
///
/// # Errors
///
/// Returns [`ContextError::Malformed`] when the frame is not a valid response.
pub fn decode_response(frame: &[u8]) -> Result<Response, ContextError> {
    serde_json::from_slice(frame).map_err(|e| ContextError::Malformed(e.to_string()))
}
