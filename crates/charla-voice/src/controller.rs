//! The voice session state machine, as a pure reducer.
//!
//! The conversation loop is:
//!
//! ```text
//!   Idle → Listening → Thinking → Speaking → Idle
//!    ▲                                         │
//!    └─────────────────────────────────────────┘
//! ```
//!
//! Three independently asynchronous sources (the capture engine, one
//! outstanding chat call, the output stream) feed events into
//! [`reduce`], which returns the next [`SessionState`] plus a list of
//! declarative [`Effect`]s for the driver to execute. Keeping the
//! transition logic in one synchronous function removes the hidden race
//! windows that scattered callback handlers would reopen.
//!
//! Every asynchronous operation is tagged with the generation that was
//! current when it started. Events carrying a different generation are
//! stale and discarded without touching the state; a per-cycle
//! `cycle_resolved` flag additionally guarantees that one listening cycle
//! commits exactly one resolution even when the engine reports "ended"
//! concurrently with a finalized result.

use std::time::Duration;

use charla_core::{AppEvent, ChatReply, SessionContext};

use crate::backend::{CaptureConfig, CaptureFault, CaptureSignal, OutputSignal};

// ── Mode ───────────────────────────────────────────────────────────

/// Current mode of the voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VoiceMode {
    /// Nothing in flight — ready for a start request.
    Idle,

    /// The capture engine is (or is about to be) listening.
    Listening,

    /// A finalized transcript was accepted; the chat call is outstanding.
    Thinking,

    /// The reply is being played back or synthesized.
    Speaking,
}

impl VoiceMode {
    /// Stable lowercase label used in events and status DTOs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        }
    }
}

// ── Configuration ──────────────────────────────────────────────────

/// Configuration for a voice session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capture engine configuration, forwarded on every listening cycle.
    /// Its locale also selects the synthesis voice.
    pub capture: CaptureConfig,

    /// Spoken when the chat backend fails.
    pub apology_text: String,

    /// Notice published when microphone access is denied at start.
    pub denied_notice: String,

    /// Notice published when the engine reports permission revoked mid-cycle.
    pub revoked_notice: String,

    /// Notice published when the capture engine cannot run at all.
    pub unavailable_notice: String,

    /// Upper bound on one capture cycle. The driver injects a
    /// generation-tagged "ended" when it elapses, which is inert if the
    /// cycle already resolved. Defensive extension — the capture engine
    /// itself usually ends a silent cycle sooner.
    pub capture_timeout: Duration,

    /// Upper bound on the chat call. Elapsing follows the backend-failure
    /// path (apology, then idle).
    pub reply_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            apology_text: "Lo siento, hubo un error. Intenta de nuevo.".to_string(),
            denied_notice: "Debes permitir el micrófono para usar esta función.".to_string(),
            revoked_notice: "Permiso de micrófono denegado.".to_string(),
            unavailable_notice: "El reconocimiento de voz no está disponible.".to_string(),
            capture_timeout: Duration::from_secs(30),
            reply_timeout: Duration::from_secs(30),
        }
    }
}

// ── State ──────────────────────────────────────────────────────────

/// The complete state of one voice session.
///
/// Mutated only by [`reduce`]; the driver holds it behind a lock and never
/// keeps the lock across an await point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Current mode. Exactly one value at any instant.
    pub mode: VoiceMode,

    /// Monotonically increasing cycle counter. Incremented on every start
    /// request and on close; events tagged with an older value are stale.
    pub generation: u64,

    /// A start request is waiting for the readiness gate to resolve.
    pub awaiting_readiness: bool,

    /// The current listening cycle already committed its resolution
    /// (result accepted, silence, or fault). Terminal capture events
    /// arriving afterwards are no-ops.
    pub cycle_resolved: bool,

    /// Last finalized recognized utterance.
    pub transcript: Option<String>,

    /// Conversation context carried into chat calls. `session_id` is
    /// replaced only after a successful reply.
    pub context: SessionContext,

    /// The session was closed. Terminal; every further event is inert.
    pub closed: bool,
}

impl SessionState {
    /// Fresh idle state with the given conversation context.
    #[must_use]
    pub const fn new(context: SessionContext) -> Self {
        Self {
            mode: VoiceMode::Idle,
            generation: 0,
            awaiting_readiness: false,
            cycle_resolved: false,
            transcript: None,
            context,
            closed: false,
        }
    }
}

// ── Events ─────────────────────────────────────────────────────────

/// Everything that can happen to a voice session.
///
/// Constructed by the driver: port methods produce `StartRequested` /
/// `CloseRequested`, spawned tasks produce the generation-tagged rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The user asked to start a listening cycle.
    StartRequested,

    /// The readiness gate resolved for the tagged start request.
    ReadinessResolved {
        /// Generation current when readiness was requested.
        generation: u64,
        /// Whether microphone access was granted.
        granted: bool,
    },

    /// The capture engine emitted a signal.
    Capture {
        /// Generation current when the capture cycle started.
        generation: u64,
        /// The signal.
        signal: CaptureSignal,
    },

    /// The chat call for the tagged cycle succeeded.
    ChatCompleted {
        /// Generation current when the call was issued.
        generation: u64,
        /// The backend's reply.
        reply: ChatReply,
    },

    /// The chat call for the tagged cycle failed (or timed out).
    ChatFailed {
        /// Generation current when the call was issued.
        generation: u64,
        /// Human-readable failure description, for logging only.
        error: String,
    },

    /// The output stream emitted a signal.
    Output {
        /// Generation current when the output was started.
        generation: u64,
        /// The signal.
        signal: OutputSignal,
    },

    /// The session is being closed.
    CloseRequested,
}

// ── Effects ────────────────────────────────────────────────────────

/// What the output selector should produce for the current reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRequest {
    /// Play server-synthesized audio verbatim.
    PlayAudio {
        /// Decoded audio bytes from the chat reply.
        audio: Vec<u8>,
    },

    /// Synthesize the text locally.
    Synthesize {
        /// Text to speak.
        text: String,
    },
}

/// Declarative side effects returned by [`reduce`].
///
/// The driver executes these after releasing the state lock; the reducer
/// itself never performs I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Resolve the readiness gate (output wake + microphone access).
    RequestReadiness {
        /// Tag for the eventual `ReadinessResolved`.
        generation: u64,
    },

    /// Open a capture cycle.
    StartCapture {
        /// Tag for every signal of this cycle.
        generation: u64,
    },

    /// Abort the current capture cycle, best-effort.
    AbortCapture,

    /// Issue the chat call for the accepted transcript.
    SendChat {
        /// Tag for the eventual completion event.
        generation: u64,
        /// The finalized utterance.
        message: String,
        /// Context snapshot taken when the transcript was accepted.
        context: SessionContext,
    },

    /// Start speech output (cancels any active output first).
    StartOutput {
        /// Tag for every signal of this stream.
        generation: u64,
        /// What to play or synthesize.
        request: OutputRequest,
    },

    /// Cancel any active output stream.
    CancelOutput,

    /// Publish an event to the application.
    Publish(AppEvent),
}

// ── Reducer ────────────────────────────────────────────────────────

/// Apply one event to the session state.
///
/// Pure: the only outputs are the next state and the effect list. Stale
/// events (generation mismatch) and events after close return the state
/// unchanged with no effects.
#[must_use]
pub fn reduce(
    state: &SessionState,
    event: ControllerEvent,
    config: &SessionConfig,
) -> (SessionState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();

    if next.closed && event != ControllerEvent::CloseRequested {
        tracing::trace!(?event, "Session closed — event discarded");
        return (next, effects);
    }

    match event {
        ControllerEvent::StartRequested => {
            if next.mode != VoiceMode::Idle || next.awaiting_readiness {
                tracing::debug!(mode = ?next.mode, "Start request ignored — session busy");
                return (next, effects);
            }
            next.generation += 1;
            next.awaiting_readiness = true;
            effects.push(Effect::RequestReadiness {
                generation: next.generation,
            });
        }

        ControllerEvent::ReadinessResolved {
            generation,
            granted,
        } => {
            if generation != next.generation {
                tracing::trace!(generation, current = next.generation, "Stale readiness result");
                return (next, effects);
            }
            if !next.awaiting_readiness {
                return (next, effects);
            }
            next.awaiting_readiness = false;
            if granted {
                next.cycle_resolved = false;
                set_mode(&mut next, VoiceMode::Listening, &mut effects);
                effects.push(Effect::StartCapture { generation });
            } else {
                tracing::info!("Microphone access denied — staying idle");
                effects.push(Effect::Publish(AppEvent::VoiceNotice {
                    message: config.denied_notice.clone(),
                }));
            }
        }

        ControllerEvent::Capture { generation, signal } => {
            if generation != next.generation {
                tracing::trace!(generation, current = next.generation, "Stale capture signal");
                return (next, effects);
            }
            reduce_capture(&mut next, signal, config, &mut effects);
        }

        ControllerEvent::ChatCompleted { generation, reply } => {
            if generation != next.generation {
                tracing::trace!(generation, current = next.generation, "Stale chat reply");
                return (next, effects);
            }
            if next.mode != VoiceMode::Thinking {
                tracing::debug!(mode = ?next.mode, "Chat reply outside thinking — ignored");
                return (next, effects);
            }
            next.context.session_id = Some(reply.session_id.clone());
            effects.push(Effect::Publish(AppEvent::VoiceSessionUpdated {
                session_id: reply.session_id,
            }));
            effects.push(Effect::Publish(AppEvent::VoiceReply {
                text: reply.text.clone(),
            }));
            set_mode(&mut next, VoiceMode::Speaking, &mut effects);
            let request = match reply.audio {
                Some(audio) => OutputRequest::PlayAudio { audio },
                None => OutputRequest::Synthesize { text: reply.text },
            };
            effects.push(Effect::StartOutput {
                generation,
                request,
            });
        }

        ControllerEvent::ChatFailed { generation, error } => {
            if generation != next.generation {
                tracing::trace!(generation, current = next.generation, "Stale chat failure");
                return (next, effects);
            }
            if next.mode != VoiceMode::Thinking {
                tracing::debug!(mode = ?next.mode, "Chat failure outside thinking — ignored");
                return (next, effects);
            }
            tracing::warn!(error = %error, "Chat call failed, speaking apology");
            set_mode(&mut next, VoiceMode::Speaking, &mut effects);
            effects.push(Effect::StartOutput {
                generation,
                request: OutputRequest::Synthesize {
                    text: config.apology_text.clone(),
                },
            });
        }

        ControllerEvent::Output { generation, signal } => {
            if generation != next.generation {
                tracing::trace!(generation, current = next.generation, "Stale output signal");
                return (next, effects);
            }
            if next.mode != VoiceMode::Speaking {
                tracing::debug!(mode = ?next.mode, "Output signal outside speaking — ignored");
                return (next, effects);
            }
            match signal {
                OutputSignal::Started => {
                    effects.push(Effect::Publish(AppEvent::VoiceSpeakingStarted));
                }
                OutputSignal::Ended => {
                    effects.push(Effect::Publish(AppEvent::VoiceSpeakingFinished));
                    set_mode(&mut next, VoiceMode::Idle, &mut effects);
                }
                OutputSignal::Errored { message } => {
                    // Same transition as a natural end; only the log differs.
                    tracing::warn!(message = %message, "Speech output errored");
                    effects.push(Effect::Publish(AppEvent::VoiceSpeakingFinished));
                    set_mode(&mut next, VoiceMode::Idle, &mut effects);
                }
            }
        }

        ControllerEvent::CloseRequested => {
            tracing::debug!(generation = next.generation, "Closing voice session");
            next.generation += 1;
            next.closed = true;
            next.awaiting_readiness = false;
            effects.push(Effect::AbortCapture);
            effects.push(Effect::CancelOutput);
            set_mode(&mut next, VoiceMode::Idle, &mut effects);
        }
    }

    (next, effects)
}

/// Capture signals for the current generation.
fn reduce_capture(
    next: &mut SessionState,
    signal: CaptureSignal,
    config: &SessionConfig,
    effects: &mut Vec<Effect>,
) {
    match signal {
        CaptureSignal::Started => {
            tracing::debug!("Capture engine listening");
        }

        CaptureSignal::Finalized { transcript } => {
            if next.mode != VoiceMode::Listening || next.cycle_resolved {
                tracing::debug!(mode = ?next.mode, "Finalized result outside open cycle — ignored");
                return;
            }
            next.cycle_resolved = true;
            next.transcript = Some(transcript.clone());
            effects.push(Effect::Publish(AppEvent::VoiceTranscript {
                text: transcript.clone(),
            }));
            set_mode(next, VoiceMode::Thinking, effects);
            effects.push(Effect::SendChat {
                generation: next.generation,
                message: transcript,
                context: next.context.clone(),
            });
        }

        CaptureSignal::Ended => {
            // The engine may report "ended" right after (or concurrently
            // with) the finalized result of the same utterance. One
            // resolution per cycle: a result already accepted wins.
            if next.mode != VoiceMode::Listening || next.cycle_resolved {
                tracing::debug!(mode = ?next.mode, "Late capture end — cycle already resolved");
                return;
            }
            tracing::debug!("Capture ended with no result");
            next.cycle_resolved = true;
            set_mode(next, VoiceMode::Idle, effects);
        }

        CaptureSignal::Faulted { fault } => {
            if next.mode != VoiceMode::Listening || next.cycle_resolved {
                tracing::debug!(mode = ?next.mode, "Late capture fault — cycle already resolved");
                return;
            }
            tracing::warn!(?fault, "Capture cycle faulted");
            next.cycle_resolved = true;
            match fault {
                CaptureFault::PermissionRevoked => {
                    effects.push(Effect::Publish(AppEvent::VoiceNotice {
                        message: config.revoked_notice.clone(),
                    }));
                }
                CaptureFault::Unavailable => {
                    effects.push(Effect::Publish(AppEvent::VoiceNotice {
                        message: config.unavailable_notice.clone(),
                    }));
                }
                CaptureFault::Other(_) => {}
            }
            set_mode(next, VoiceMode::Idle, effects);
        }
    }
}

/// Transition to `mode`, publishing the change if it is one.
fn set_mode(state: &mut SessionState, mode: VoiceMode, effects: &mut Vec<Effect>) {
    if state.mode != mode {
        tracing::debug!(old = ?state.mode, new = ?mode, "Voice mode transition");
        state.mode = mode;
        effects.push(Effect::Publish(AppEvent::VoiceModeChanged {
            mode: mode.label().to_owned(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::default()
    }

    fn idle_state() -> SessionState {
        SessionState::new(SessionContext::default())
    }

    /// Drive the state through start → readiness granted → Listening.
    fn listening_state() -> SessionState {
        let state = idle_state();
        let (state, _) = reduce(&state, ControllerEvent::StartRequested, &config());
        let (state, _) = reduce(
            &state,
            ControllerEvent::ReadinessResolved {
                generation: state.generation,
                granted: true,
            },
            &config(),
        );
        assert_eq!(state.mode, VoiceMode::Listening);
        state
    }

    /// Listening → finalized result → Thinking.
    fn thinking_state(transcript: &str) -> SessionState {
        let state = listening_state();
        let (state, _) = reduce(
            &state,
            ControllerEvent::Capture {
                generation: state.generation,
                signal: CaptureSignal::Finalized {
                    transcript: transcript.to_string(),
                },
            },
            &config(),
        );
        assert_eq!(state.mode, VoiceMode::Thinking);
        state
    }

    fn reply(session_id: &str, audio: Option<Vec<u8>>) -> ChatReply {
        ChatReply {
            text: "El pan cuesta 2 dólares".to_string(),
            session_id: session_id.to_string(),
            audio,
        }
    }

    fn chat_effects(effects: &[Effect]) -> Vec<&Effect> {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::SendChat { .. }))
            .collect()
    }

    // ── Start / readiness ──────────────────────────────────────────

    #[test]
    fn start_from_idle_requests_readiness_and_bumps_generation() {
        let state = idle_state();
        let (next, effects) = reduce(&state, ControllerEvent::StartRequested, &config());

        assert_eq!(next.mode, VoiceMode::Idle);
        assert_eq!(next.generation, 1);
        assert!(next.awaiting_readiness);
        assert_eq!(effects, vec![Effect::RequestReadiness { generation: 1 }]);
    }

    #[test]
    fn readiness_granted_enters_listening_and_starts_capture() {
        let state = idle_state();
        let (state, _) = reduce(&state, ControllerEvent::StartRequested, &config());
        let (next, effects) = reduce(
            &state,
            ControllerEvent::ReadinessResolved {
                generation: 1,
                granted: true,
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Listening);
        assert!(!next.awaiting_readiness);
        assert!(effects.contains(&Effect::StartCapture { generation: 1 }));
        assert!(effects.contains(&Effect::Publish(AppEvent::VoiceModeChanged {
            mode: "listening".to_string(),
        })));
    }

    #[test]
    fn readiness_denied_stays_idle_with_notice() {
        let state = idle_state();
        let (state, _) = reduce(&state, ControllerEvent::StartRequested, &config());
        let (next, effects) = reduce(
            &state,
            ControllerEvent::ReadinessResolved {
                generation: 1,
                granted: false,
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Idle);
        assert!(!next.awaiting_readiness);
        assert_eq!(
            effects,
            vec![Effect::Publish(AppEvent::VoiceNotice {
                message: config().denied_notice,
            })]
        );
    }

    #[test]
    fn start_ignored_while_awaiting_readiness() {
        let state = idle_state();
        let (state, _) = reduce(&state, ControllerEvent::StartRequested, &config());
        let (next, effects) = reduce(&state, ControllerEvent::StartRequested, &config());

        assert_eq!(next.generation, 1);
        assert!(effects.is_empty());
    }

    #[test]
    fn start_ignored_outside_idle() {
        let state = listening_state();
        let (next, effects) = reduce(&state, ControllerEvent::StartRequested, &config());
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    #[test]
    fn stale_readiness_result_is_inert() {
        let state = listening_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::ReadinessResolved {
                generation: state.generation - 1,
                granted: true,
            },
            &config(),
        );
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    // ── Listening ──────────────────────────────────────────────────

    #[test]
    fn finalized_result_enters_thinking_with_one_chat_call() {
        let state = listening_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Capture {
                generation: state.generation,
                signal: CaptureSignal::Finalized {
                    transcript: "precio del pan".to_string(),
                },
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Thinking);
        assert!(next.cycle_resolved);
        assert_eq!(next.transcript.as_deref(), Some("precio del pan"));
        assert_eq!(chat_effects(&effects).len(), 1);
        assert!(effects.contains(&Effect::SendChat {
            generation: state.generation,
            message: "precio del pan".to_string(),
            context: SessionContext::default(),
        }));
        assert!(effects.contains(&Effect::Publish(AppEvent::VoiceTranscript {
            text: "precio del pan".to_string(),
        })));
    }

    #[test]
    fn second_finalized_result_in_same_cycle_is_ignored() {
        let state = thinking_state("hola");
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Capture {
                generation: state.generation,
                signal: CaptureSignal::Finalized {
                    transcript: "otra cosa".to_string(),
                },
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Thinking);
        assert_eq!(next.transcript.as_deref(), Some("hola"));
        assert!(chat_effects(&effects).is_empty());
    }

    #[test]
    fn end_without_result_returns_to_idle_without_chat_call() {
        let state = listening_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Capture {
                generation: state.generation,
                signal: CaptureSignal::Ended,
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Idle);
        assert!(chat_effects(&effects).is_empty());
    }

    #[test]
    fn ended_after_result_is_a_no_op() {
        // The ended/result race: once the result is accepted, "ended" for
        // the same generation must not revert the mode.
        let state = thinking_state("precio del pan");
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Capture {
                generation: state.generation,
                signal: CaptureSignal::Ended,
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Thinking);
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    #[test]
    fn stale_capture_signal_is_discarded() {
        let state = listening_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Capture {
                generation: state.generation + 7,
                signal: CaptureSignal::Finalized {
                    transcript: "fantasma".to_string(),
                },
            },
            &config(),
        );
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    #[test]
    fn permission_revoked_fault_notifies_and_idles() {
        let state = listening_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Capture {
                generation: state.generation,
                signal: CaptureSignal::Faulted {
                    fault: CaptureFault::PermissionRevoked,
                },
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Idle);
        assert!(effects.contains(&Effect::Publish(AppEvent::VoiceNotice {
            message: config().revoked_notice,
        })));
    }

    #[test]
    fn other_fault_idles_without_notice() {
        let state = listening_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Capture {
                generation: state.generation,
                signal: CaptureSignal::Faulted {
                    fault: CaptureFault::Other("no-speech".to_string()),
                },
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Idle);
        assert!(
            !effects
                .iter()
                .any(|e| matches!(e, Effect::Publish(AppEvent::VoiceNotice { .. })))
        );
    }

    // ── Thinking ───────────────────────────────────────────────────

    #[test]
    fn reply_with_audio_plays_it_verbatim() {
        let state = thinking_state("precio del pan");
        let audio = vec![0x49, 0x44, 0x33];
        let (next, effects) = reduce(
            &state,
            ControllerEvent::ChatCompleted {
                generation: state.generation,
                reply: reply("abc123", Some(audio.clone())),
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Speaking);
        assert_eq!(next.context.session_id.as_deref(), Some("abc123"));
        assert!(effects.contains(&Effect::StartOutput {
            generation: state.generation,
            request: OutputRequest::PlayAudio { audio },
        }));
    }

    #[test]
    fn reply_without_audio_synthesizes_the_text() {
        let state = thinking_state("precio del pan");
        let (next, effects) = reduce(
            &state,
            ControllerEvent::ChatCompleted {
                generation: state.generation,
                reply: reply("abc123", None),
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Speaking);
        assert!(effects.contains(&Effect::StartOutput {
            generation: state.generation,
            request: OutputRequest::Synthesize {
                text: "El pan cuesta 2 dólares".to_string(),
            },
        }));
        assert!(effects.contains(&Effect::Publish(AppEvent::VoiceSessionUpdated {
            session_id: "abc123".to_string(),
        })));
        assert!(effects.contains(&Effect::Publish(AppEvent::VoiceReply {
            text: "El pan cuesta 2 dólares".to_string(),
        })));
    }

    #[test]
    fn chat_failure_speaks_apology_and_keeps_session_id() {
        let mut state = thinking_state("hola");
        state.context.session_id = Some("before-1".to_string());

        let (next, effects) = reduce(
            &state,
            ControllerEvent::ChatFailed {
                generation: state.generation,
                error: "Network error: connection refused".to_string(),
            },
            &config(),
        );

        assert_eq!(next.mode, VoiceMode::Speaking);
        assert_eq!(next.context.session_id.as_deref(), Some("before-1"));
        assert!(effects.contains(&Effect::StartOutput {
            generation: state.generation,
            request: OutputRequest::Synthesize {
                text: config().apology_text,
            },
        }));
    }

    #[test]
    fn stale_chat_reply_is_discarded() {
        let state = thinking_state("hola");
        let (next, effects) = reduce(
            &state,
            ControllerEvent::ChatCompleted {
                generation: state.generation - 1,
                reply: reply("ghost", None),
            },
            &config(),
        );
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    // ── Speaking ───────────────────────────────────────────────────

    fn speaking_state() -> SessionState {
        let state = thinking_state("precio del pan");
        let (state, _) = reduce(
            &state,
            ControllerEvent::ChatCompleted {
                generation: state.generation,
                reply: reply("abc123", None),
            },
            &config(),
        );
        assert_eq!(state.mode, VoiceMode::Speaking);
        state
    }

    #[test]
    fn output_started_publishes_speaking_started() {
        let state = speaking_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Output {
                generation: state.generation,
                signal: OutputSignal::Started,
            },
            &config(),
        );
        assert_eq!(next.mode, VoiceMode::Speaking);
        assert_eq!(
            effects,
            vec![Effect::Publish(AppEvent::VoiceSpeakingStarted)]
        );
    }

    #[test]
    fn output_ended_returns_to_idle() {
        let state = speaking_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Output {
                generation: state.generation,
                signal: OutputSignal::Ended,
            },
            &config(),
        );
        assert_eq!(next.mode, VoiceMode::Idle);
        assert!(effects.contains(&Effect::Publish(AppEvent::VoiceSpeakingFinished)));
        // Session id from the reply survives into idle.
        assert_eq!(next.context.session_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn output_error_is_treated_like_completion() {
        let state = speaking_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Output {
                generation: state.generation,
                signal: OutputSignal::Errored {
                    message: "device lost".to_string(),
                },
            },
            &config(),
        );
        assert_eq!(next.mode, VoiceMode::Idle);
        assert!(effects.contains(&Effect::Publish(AppEvent::VoiceSpeakingFinished)));
    }

    #[test]
    fn stale_output_signal_is_discarded() {
        let state = speaking_state();
        let (next, effects) = reduce(
            &state,
            ControllerEvent::Output {
                generation: state.generation + 1,
                signal: OutputSignal::Ended,
            },
            &config(),
        );
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    // ── Close ──────────────────────────────────────────────────────

    #[test]
    fn close_aborts_everything_and_bumps_generation() {
        let state = thinking_state("hola");
        let before = state.generation;
        let (next, effects) = reduce(&state, ControllerEvent::CloseRequested, &config());

        assert!(next.closed);
        assert_eq!(next.mode, VoiceMode::Idle);
        assert_eq!(next.generation, before + 1);
        assert!(effects.contains(&Effect::AbortCapture));
        assert!(effects.contains(&Effect::CancelOutput));
    }

    #[test]
    fn events_after_close_leave_no_trace() {
        let state = thinking_state("hola");
        let pending_generation = state.generation;
        let (state, _) = reduce(&state, ControllerEvent::CloseRequested, &config());

        // The chat call issued before close resolves late.
        let (next, effects) = reduce(
            &state,
            ControllerEvent::ChatCompleted {
                generation: pending_generation,
                reply: reply("late-session", None),
            },
            &config(),
        );

        assert_eq!(next, state);
        assert!(next.context.session_id.is_none());
        assert!(effects.is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let state = listening_state();
        let (state, _) = reduce(&state, ControllerEvent::CloseRequested, &config());
        let generation = state.generation;
        let (next, _) = reduce(&state, ControllerEvent::CloseRequested, &config());
        assert!(next.closed);
        assert_eq!(next.generation, generation + 1);
    }

    #[test]
    fn start_after_close_is_ignored() {
        let state = idle_state();
        let (state, _) = reduce(&state, ControllerEvent::CloseRequested, &config());
        let (next, effects) = reduce(&state, ControllerEvent::StartRequested, &config());
        assert_eq!(next, state);
        assert!(effects.is_empty());
    }

    // ── Mode labels ────────────────────────────────────────────────

    #[test]
    fn mode_labels_are_lowercase() {
        assert_eq!(VoiceMode::Idle.label(), "idle");
        assert_eq!(VoiceMode::Listening.label(), "listening");
        assert_eq!(VoiceMode::Thinking.label(), "thinking");
        assert_eq!(VoiceMode::Speaking.label(), "speaking");
    }

    #[test]
    fn default_config_uses_spanish_locale() {
        let config = SessionConfig::default();
        assert_eq!(config.capture.locale, "es-ES");
        assert!(!config.capture.continuous);
        assert_eq!(config.capture_timeout, Duration::from_secs(30));
        assert_eq!(config.reply_timeout, Duration::from_secs(30));
    }
}
