//! Voice subsystem error types.

/// Errors that can occur in the voice subsystem.
///
/// None of these are fatal to the session: every failure path terminates
/// back at the idle mode so the user can retry.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// The speech capture engine is not available on this platform.
    #[error("Speech capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// The capture engine refused to start a cycle.
    #[error("Failed to start speech capture: {0}")]
    CaptureStart(String),

    /// Failed to open or write the audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStream(String),

    /// The dedicated audio output thread is gone.
    #[error("Audio output thread terminated")]
    OutputThreadDied,

    /// The audio payload could not be decoded for playback.
    #[error("Audio decode failed: {0}")]
    AudioDecode(String),

    /// Local speech synthesis failed to start.
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_detail() {
        let err = VoiceError::AudioDecode("bad MPEG frame".to_string());
        assert_eq!(err.to_string(), "Audio decode failed: bad MPEG frame");

        let err = VoiceError::CaptureUnavailable("no engine".to_string());
        assert_eq!(err.to_string(), "Speech capture unavailable: no engine");
    }
}
