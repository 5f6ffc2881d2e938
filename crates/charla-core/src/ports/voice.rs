//! Voice session port — trait abstraction for UI-facing session control.
//!
//! # Design Rules
//!
//! - The DTO here is a transport-agnostic wire shape (no `charla-voice`
//!   types). Conversion from native session state happens inside
//!   `charla-voice`, never here.
//! - `VoiceSessionPort` is the only surface a UI adapter needs to drive
//!   the voice interface: start a listening cycle, close it, read status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Current externally observable state of the voice session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceStatusDto {
    /// Mode label (`"idle"`, `"listening"`, `"thinking"`, `"speaking"`).
    pub mode: String,
    /// Backend conversation session id, if one has been assigned.
    pub session_id: Option<String>,
    /// The last finalized utterance recognized from the user, if any.
    pub last_transcript: Option<String>,
    /// Whether the session has been closed (terminal — create a new one).
    pub closed: bool,
}

/// Port trait for driving a voice session from a UI adapter.
///
/// Implemented by `VoiceSession` in `charla-voice`. All methods are
/// fire-and-forget or read-only: outcomes (mode changes, notices,
/// transcripts) are observed through the event stream, mirroring how a
/// push-button UI consumes them.
#[async_trait]
pub trait VoiceSessionPort: Send + Sync {
    /// Request a new listening cycle (the user pressed the talk button).
    ///
    /// Ignored unless the session is idle; a permission denial surfaces as
    /// a `VoiceNotice` event rather than an error.
    async fn request_start(&self);

    /// Close the session: abort capture, cancel output, invalidate all
    /// in-flight work. Terminal.
    async fn close(&self);

    /// Return the current status snapshot.
    async fn status(&self) -> VoiceStatusDto;
}
