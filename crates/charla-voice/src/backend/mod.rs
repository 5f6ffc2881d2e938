//! Voice engine backend traits — engine-agnostic interfaces for capture,
//! synthesis, and playback.
//!
//! The [`VoiceSession`](crate::session::VoiceSession) operates on trait
//! objects so that platform engines can be swapped without touching the
//! controller logic, and so that tests can drive the full session with
//! scripted fakes emitting deliberately out-of-order event sequences.
//!
//! All signal streams are plain `tokio::sync::mpsc` senders: backends fire
//! platform callbacks into the channel, and the session stamps each signal
//! with the generation that was current when the operation started.

use tokio::sync::mpsc;

use crate::error::VoiceError;

// ── Capture ────────────────────────────────────────────────────

/// Configuration handed to the speech capture engine.
///
/// Defaults mirror a single-utterance assistant: one finalized result per
/// cycle, no interim hypotheses, Spanish locale.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CaptureConfig {
    /// BCP 47 locale the recognizer should use (e.g. `"es-ES"`).
    pub locale: String,

    /// Whether the engine keeps recognizing after the first final result.
    /// The session assumes `false`: at most one result per start/stop cycle.
    pub continuous: bool,

    /// Whether the engine should report interim (non-final) hypotheses.
    pub interim_results: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            locale: "es-ES".to_string(),
            continuous: false,
            interim_results: false,
        }
    }
}

/// Signals emitted by a capture engine during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSignal {
    /// The engine actually started listening.
    Started,

    /// A finalized (non-interim) recognition result.
    Finalized {
        /// The recognized utterance.
        transcript: String,
    },

    /// The engine failed mid-cycle.
    Faulted {
        /// What went wrong, pre-classified by the backend.
        fault: CaptureFault,
    },

    /// The engine stopped listening. May arrive immediately after — or
    /// concurrently with — `Finalized` for the same utterance.
    Ended,
}

/// Classified capture failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureFault {
    /// The user revoked (or never granted) microphone permission.
    PermissionRevoked,

    /// The capture engine does not exist or cannot run on this platform.
    Unavailable,

    /// Any other engine-reported error, with its platform code.
    Other(String),
}

impl CaptureFault {
    /// Classify a platform error code.
    ///
    /// `not-allowed` / `service-not-allowed` are the permission-revocation
    /// codes reported by browser-style recognizers.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" => Self::PermissionRevoked,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Backend-agnostic speech capture engine.
///
/// Non-continuous: one `start` opens one cycle which terminates with
/// `Ended` (and at most one `Finalized` before it). Implementations must
/// be `Send + Sync` so the session can hold them across `.await` points.
pub trait CaptureBackend: Send + Sync {
    /// Begin one capture cycle with the given configuration, firing
    /// signals into `signals`.
    ///
    /// Returns an error only when the cycle could not be opened at all
    /// (engine missing, already running); mid-cycle failures arrive as
    /// [`CaptureSignal::Faulted`].
    fn start(
        &self,
        config: &CaptureConfig,
        signals: mpsc::UnboundedSender<CaptureSignal>,
    ) -> Result<(), VoiceError>;

    /// Abort the current cycle, best-effort. Platform engines may still
    /// deliver late callbacks afterwards; the session discards them by
    /// generation tag.
    fn abort(&self);
}

// ── Output ─────────────────────────────────────────────────────

/// Signals emitted by an output stream (playback or synthesis).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSignal {
    /// Audio actually started.
    Started,

    /// The stream drained naturally.
    Ended,

    /// The stream failed. Resolved identically to `Ended` by the session —
    /// the difference is only logged.
    Errored {
        /// Backend-reported failure description.
        message: String,
    },
}

/// One utterance for local text-to-speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Text to speak.
    pub text: String,
    /// BCP 47 locale to synthesize in.
    pub locale: String,
    /// Preferred voice id, when a locale-matching voice was found.
    /// `None` means the platform default voice.
    pub voice: Option<String>,
}

/// Information about an available synthesis voice.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInfo {
    /// Voice identifier (used when requesting synthesis).
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Voice language as a BCP 47 tag (e.g. `"es-MX"`).
    pub language: String,
}

/// Backend-agnostic local text-to-speech engine.
pub trait SynthesisBackend: Send + Sync {
    /// Speak one utterance, firing signals into `signals`.
    fn speak(
        &self,
        utterance: &Utterance,
        signals: mpsc::UnboundedSender<OutputSignal>,
    ) -> Result<(), VoiceError>;

    /// Stop the current utterance immediately.
    fn cancel(&self);

    /// List the voices this engine can synthesize with.
    fn available_voices(&self) -> Vec<VoiceInfo>;
}

/// Backend-agnostic audio playback for server-synthesized byte payloads.
pub trait PlaybackBackend: Send + Sync {
    /// Decode and play an audio payload, firing signals into `signals`.
    fn play(
        &self,
        audio: Vec<u8>,
        signals: mpsc::UnboundedSender<OutputSignal>,
    ) -> Result<(), VoiceError>;

    /// Stop playback immediately. No signal is emitted for a stopped
    /// stream — only natural completion reports `Ended`.
    fn stop(&self);

    /// Wake a suspended output device.
    ///
    /// Platforms with autoplay restrictions refuse to open an output
    /// stream until a user gesture; the readiness gate calls this once,
    /// inside the first start request.
    fn resume_output(&self);
}
