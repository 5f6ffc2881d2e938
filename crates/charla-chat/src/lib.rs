//! HTTP chat backend client for charla.
//!
//! Implements [`charla_core::ChatPort`] over the backend's JSON chat
//! endpoint: one `POST {base_url}/chat` per finalized utterance, carrying
//! the session context, and a reply that optionally includes
//! server-synthesized audio (base64-encoded MPEG) for the output selector
//! to play verbatim.
//!
//! Everything transport-specific lives in this crate; the voice session
//! only ever sees [`charla_core::ChatReply`] and [`charla_core::ChatPortError`].

#![deny(unused_crate_dependencies)]

mod client;
mod config;
mod wire;

pub use client::HttpChatClient;
pub use config::ChatClientConfig;
