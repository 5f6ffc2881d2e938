//! Public configuration for the chat backend client.

use std::time::Duration;

/// Configuration for [`HttpChatClient`](crate::HttpChatClient).
///
/// Use the builder pattern methods to customize the client configuration.
///
/// # Example
///
/// ```
/// use charla_chat::ChatClientConfig;
/// use std::time::Duration;
///
/// let config = ChatClientConfig::new("http://localhost:8000")
///     .with_timeout(Duration::from_secs(60))
///     .without_server_audio();
/// ```
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    /// Base URL of the backend (no trailing `/chat`).
    pub(crate) base_url: String,
    /// Request timeout applied by the HTTP client.
    pub(crate) timeout: Duration,
    /// Whether to ask the backend to synthesize reply audio server-side.
    pub(crate) generate_audio: bool,
    /// User agent string for HTTP requests.
    pub(crate) user_agent: String,
}

impl ChatClientConfig {
    /// Create a configuration pointing at the given backend base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            generate_audio: true,
            user_agent: concat!("charla-chat/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the request timeout.
    ///
    /// Defaults to 30 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the backend not to synthesize audio server-side.
    ///
    /// Replies then carry no audio payload and the voice session falls back
    /// to local synthesis for every reply.
    #[must_use]
    pub const fn without_server_audio(mut self) -> Self {
        self.generate_audio = false;
        self
    }

    /// Set the user agent string for HTTP requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The `/chat` endpoint URL, tolerant of a trailing slash in `base_url`.
    pub(crate) fn chat_endpoint(&self) -> String {
        format!("{}/chat", self.base_url.trim_end_matches('/'))
    }
}
