//! Port definitions — trait abstractions between the domain and adapters.
//!
//! Ports keep the dependency arrows one-way: adapter crates implement the
//! traits defined here, and the voice subsystem consumes them without
//! knowing which implementation it was wired with. This is what makes the
//! controller deterministic to test — every asynchronous collaborator can
//! be replaced with a scripted fake.

pub mod chat;
pub mod event_emitter;
pub mod voice;

pub use chat::{ChatPort, ChatPortError, ChatReply, SessionContext};
pub use event_emitter::{AppEventEmitter, NoopEmitter};
pub use voice::{VoiceSessionPort, VoiceStatusDto};
