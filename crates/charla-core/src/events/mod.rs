//! Canonical event union for all cross-adapter events.
//!
//! This module is the single source of truth for events emitted by the
//! voice subsystem and consumed by UI adapters (overlay widgets, SSE
//! handlers, logging bridges).
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag for TypeScript compatibility:
//!
//! ```json
//! { "type": "voice_mode_changed", "mode": "listening" }
//! ```

use serde::{Deserialize, Serialize};

/// Canonical event types for all adapters.
///
/// Each variant includes all necessary context for the event to be
/// self-describing; consumers never need to query back into the session
/// to interpret one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// The voice session entered a new mode.
    VoiceModeChanged {
        /// Mode label (`"idle"`, `"listening"`, `"thinking"`, `"speaking"`).
        mode: String,
    },

    /// A finalized utterance was recognized from the user.
    VoiceTranscript {
        /// The recognized text.
        text: String,
    },

    /// The assistant produced a reply for the last utterance.
    VoiceReply {
        /// The reply text (also spoken through the output channel).
        text: String,
    },

    /// Speech output started playing.
    VoiceSpeakingStarted,

    /// Speech output finished (or errored — indistinguishable to the UI).
    VoiceSpeakingFinished,

    /// A user-visible notice (permission denied, capture unavailable, …).
    VoiceNotice {
        /// Human-readable notice text, already localized.
        message: String,
    },

    /// The backend returned a new conversation session id.
    VoiceSessionUpdated {
        /// The session id to carry into the next chat call.
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}
