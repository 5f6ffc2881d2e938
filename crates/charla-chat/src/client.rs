//! The reqwest-backed [`ChatPort`] implementation.

use async_trait::async_trait;

use charla_core::{ChatPort, ChatPortError, ChatReply, SessionContext};

use crate::config::ChatClientConfig;
use crate::wire::{ChatRequestBody, ChatResponseBody, ErrorBody, decode_audio};

/// Production chat client speaking the backend's JSON protocol.
///
/// One instance is shared for the lifetime of the application; reqwest
/// pools connections internally. The configured timeout bounds every call,
/// so a stalled backend surfaces as [`ChatPortError::Timeout`] and the
/// voice session can recover through its apology path.
pub struct HttpChatClient {
    config: ChatClientConfig,
    client: reqwest::Client,
}

impl HttpChatClient {
    /// Create a new client from the given configuration.
    pub fn new(config: ChatClientConfig) -> Result<Self, ChatPortError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ChatPortError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl ChatPort for HttpChatClient {
    async fn send(
        &self,
        message: &str,
        context: &SessionContext,
    ) -> Result<ChatReply, ChatPortError> {
        let body = ChatRequestBody {
            message,
            session_id: context.session_id.as_deref(),
            user_id: context.user_id.as_deref(),
            generate_audio: self.config.generate_audio,
        };

        tracing::debug!(
            endpoint = %self.config.chat_endpoint(),
            has_session = context.session_id.is_some(),
            "Sending chat message"
        );

        let response = self
            .client
            .post(self.config.chat_endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatPortError::Timeout
                } else {
                    ChatPortError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // The backend reports failures as {"detail": "..."}; fall back
            // to the bare status line when the body is not parseable.
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or_else(|| format!("HTTP {status}"));
            tracing::warn!(%status, detail = %detail, "Chat backend rejected the request");
            return Err(ChatPortError::Backend(detail));
        }

        let body: ChatResponseBody = response
            .json()
            .await
            .map_err(|e| ChatPortError::InvalidResponse(e.to_string()))?;

        let audio = decode_audio(body.audio)?;

        tracing::debug!(
            session_id = %body.session_id,
            reply_len = body.response.len(),
            server_audio = audio.is_some(),
            "Chat reply received"
        );

        Ok(ChatReply {
            text: body.response,
            session_id: body.session_id,
            audio,
        })
    }
}
