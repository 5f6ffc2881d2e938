//! Speech output selection — server audio playback vs. local synthesis.
//!
//! The selector owns the single logical output channel the session may
//! have active at once. Server-synthesized audio is preferred and played
//! verbatim; otherwise the reply text is synthesized locally, in the
//! configured locale, with a locale-matching voice when one exists.
//! Starting new output cancels any existing stream first, synchronously,
//! so the channel is never doubly active.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::{OutputSignal, PlaybackBackend, SynthesisBackend, Utterance, VoiceInfo};
use crate::controller::OutputRequest;
use crate::error::VoiceError;

/// Routes each reply to playback or synthesis and enforces the
/// one-active-stream rule.
pub struct OutputSelector {
    playback: Arc<dyn PlaybackBackend>,
    synthesis: Arc<dyn SynthesisBackend>,
    locale: String,
}

impl OutputSelector {
    /// Create a selector over the given backends.
    ///
    /// `locale` is the BCP 47 tag used for local synthesis (and voice
    /// preference); the session passes its capture locale so recognition
    /// and synthesis speak the same language.
    pub fn new(
        playback: Arc<dyn PlaybackBackend>,
        synthesis: Arc<dyn SynthesisBackend>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            playback,
            synthesis,
            locale: locale.into(),
        }
    }

    /// Start speech output, cancelling any active stream first.
    ///
    /// Signals from the new stream arrive on `signals`; late signals from
    /// the cancelled stream, if the platform delivers any, are discarded
    /// upstream by generation tag.
    pub fn start(
        &self,
        request: OutputRequest,
        signals: mpsc::UnboundedSender<OutputSignal>,
    ) -> Result<(), VoiceError> {
        self.cancel();

        match request {
            OutputRequest::PlayAudio { audio } => {
                tracing::debug!(bytes = audio.len(), "Playing server-synthesized audio");
                self.playback.play(audio, signals)
            }
            OutputRequest::Synthesize { text } => {
                let voice = select_voice(&self.synthesis.available_voices(), &self.locale);
                match voice {
                    Some(ref id) => tracing::debug!(voice = %id, "Synthesizing reply locally"),
                    None => tracing::debug!(
                        locale = %self.locale,
                        "No matching voice — using platform default"
                    ),
                }
                let utterance = Utterance {
                    text,
                    locale: self.locale.clone(),
                    voice,
                };
                self.synthesis.speak(&utterance, signals)
            }
        }
    }

    /// Cancel whatever is currently playing or being synthesized.
    pub fn cancel(&self) {
        self.playback.stop();
        self.synthesis.cancel();
    }

    /// Wake a suspended output device (autoplay gating).
    pub(crate) fn resume_output(&self) {
        self.playback.resume_output();
    }
}

/// Pick the first voice whose language matches the locale's primary
/// language subtag (`"es"` from `"es-ES"` matches `"es"` and `"es-MX"`).
fn select_voice(voices: &[VoiceInfo], locale: &str) -> Option<String> {
    let prefix = locale.split(['-', '_']).next().unwrap_or(locale);
    voices
        .iter()
        .find(|v| {
            v.language == prefix
                || v.language
                    .split(['-', '_'])
                    .next()
                    .is_some_and(|lang| lang == prefix)
        })
        .map(|v| v.id.clone())
}
