//! Core domain types and port definitions for charla.
//!
//! This crate is the transport-agnostic center of the workspace: it defines
//! the port traits the voice subsystem consumes (`ChatPort`,
//! `AppEventEmitter`, `VoiceSessionPort`) and the canonical [`AppEvent`]
//! union UI adapters subscribe to. Adapter crates (`charla-chat`,
//! `charla-voice`) depend on this crate; it depends on none of them.

#![deny(unused_crate_dependencies)]

pub mod events;
pub mod ports;

// Re-export commonly used types for convenience
pub use events::AppEvent;
pub use ports::{
    AppEventEmitter, ChatPort, ChatPortError, ChatReply, NoopEmitter, SessionContext,
    VoiceSessionPort, VoiceStatusDto,
};
