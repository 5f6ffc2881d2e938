//! Chat backend port — trait abstraction for the remote conversational call.
//!
//! The voice session issues exactly one chat call per finalized utterance
//! and consumes the result through this port. Transport, retries, and wire
//! encoding are adapter concerns (`charla-chat` ships the HTTP/JSON
//! implementation); nothing here may leak an HTTP type.

use async_trait::async_trait;
use thiserror::Error;

// ── Context & reply ──────────────────────────────────────────────────────────

/// Conversation context carried into every chat call.
///
/// `session_id` is `None` until the backend assigns one; it is replaced
/// only after a successful reply, never speculatively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Backend conversation session id, if one has been assigned.
    pub session_id: Option<String>,
    /// Authenticated user id, if the surrounding application has one.
    pub user_id: Option<String>,
}

impl SessionContext {
    /// Create a context for the given user with no session assigned yet.
    #[must_use]
    pub const fn for_user(user_id: Option<String>) -> Self {
        Self {
            session_id: None,
            user_id,
        }
    }
}

/// A successful reply from the chat backend.
///
/// Immutable — produced once per successful call and handed to the output
/// selector as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// The assistant's reply text.
    pub text: String,
    /// The (possibly new) conversation session id.
    pub session_id: String,
    /// Server-synthesized audio of the reply (decoded bytes), if the
    /// backend produced any. When absent the client synthesizes locally.
    pub audio: Option<Vec<u8>>,
}

// ── Error ────────────────────────────────────────────────────────────────────

/// Errors returned by `ChatPort` implementations.
///
/// All variants are recoverable for the session: the controller routes any
/// of them to the spoken-apology path and returns to idle.
#[derive(Debug, Error)]
pub enum ChatPortError {
    /// The request never reached the backend (DNS, connect, TLS, …).
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a failure, with its human-readable detail.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend answered 2xx but the body could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request exceeded the configured deadline.
    #[error("Chat request timed out")]
    Timeout,
}

// ── Port trait ───────────────────────────────────────────────────────────────

/// Port trait for the remote conversational backend.
///
/// Implemented by `HttpChatClient` in `charla-chat`; replaced with scripted
/// fakes in the voice session tests.
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Send one user utterance with its session context and return the
    /// backend's reply.
    ///
    /// Callers must treat a returned error as terminal for this exchange —
    /// the port performs whatever retrying it considers transport-level.
    async fn send(&self, message: &str, context: &SessionContext)
    -> Result<ChatReply, ChatPortError>;
}
