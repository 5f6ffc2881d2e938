//! Voice interaction session for charla.
//!
//! Coordinates three independently asynchronous sources — a speech
//! capture engine, one outstanding chat call, and a speech output
//! stream — into a single always-recoverable conversational loop:
//!
//! ```text
//!   Idle → Listening → Thinking → Speaking → Idle
//! ```
//!
//! The transition logic lives in [`controller`] as a pure reducer;
//! [`session::VoiceSession`] drives it, executing declarative effects and
//! stamping every asynchronous callback with the generation current when
//! its operation started, so stale and out-of-order events are discarded
//! instead of corrupting state.
//!
//! Engines are injected through the traits in [`backend`]; this crate
//! ships a `rodio` playback implementation ([`RodioPlayback`]) for
//! server-synthesized reply audio, while capture and local synthesis are
//! platform engines supplied by the embedding application.

#![deny(unused_crate_dependencies)]

pub mod backend;
pub mod controller;
pub mod error;
pub mod gate;
pub mod output;
pub mod playback;
pub mod session;

// Re-export key types for convenience
pub use backend::{
    CaptureBackend, CaptureConfig, CaptureFault, CaptureSignal, OutputSignal, PlaybackBackend,
    SynthesisBackend, Utterance, VoiceInfo,
};
pub use controller::{SessionConfig, VoiceMode};
pub use error::VoiceError;
pub use gate::{AlwaysGranted, MicrophoneAccess, ReadinessGate};
pub use output::OutputSelector;
pub use playback::RodioPlayback;
pub use session::{SessionBackends, VoiceSession};
