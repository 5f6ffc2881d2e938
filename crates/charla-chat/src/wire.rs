//! Wire types for the backend's JSON chat endpoint.
//!
//! Field names follow the backend's snake_case API. The reply's `audio`
//! field, when present, is base64-encoded MPEG audio synthesized
//! server-side; it is decoded to raw bytes before leaving this crate.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use charla_core::ChatPortError;

/// Request body for `POST /chat`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequestBody<'a> {
    pub message: &'a str,
    pub session_id: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub generate_audio: bool,
}

/// Success body from `POST /chat`.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseBody {
    pub response: String,
    pub session_id: String,
    /// Base64-encoded audio of the reply, when server synthesis ran.
    #[serde(default)]
    pub audio: Option<String>,
}

/// Failure body — the backend reports a human-readable `detail`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// Decode the optional base64 audio payload into raw bytes.
pub(crate) fn decode_audio(audio: Option<String>) -> Result<Option<Vec<u8>>, ChatPortError> {
    match audio {
        None => Ok(None),
        Some(encoded) => BASE64
            .decode(encoded.as_bytes())
            .map(Some)
            .map_err(|e| ChatPortError::InvalidResponse(format!("audio payload: {e}"))),
    }
}
