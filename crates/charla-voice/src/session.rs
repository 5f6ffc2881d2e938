//! `VoiceSession` — the driver that executes reducer effects.
//!
//! This module is the single place where the pure state machine in
//! [`controller`](crate::controller) meets the asynchronous world: port
//! methods and spawned tasks feed [`ControllerEvent`]s into [`apply`],
//! which runs the reducer and then executes the returned effects.
//!
//! # Locking discipline
//!
//! `SessionState` lives behind a std `Mutex`. The reducer runs under the
//! lock; effects are executed strictly after it is released, so the lock
//! is never held across an await point and an effect that re-enters
//! `apply` (e.g. a capture start failure) cannot deadlock.
//!
//! # Generation stamping
//!
//! Every spawned forwarder captures the generation that was current when
//! its operation started and stamps it onto each signal. A cycle that is
//! cancelled or superseded cannot always stop platform callbacks, but
//! their stamped events fail the generation check in the reducer and die
//! there.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use charla_core::{
    AppEventEmitter, ChatPort, ChatPortError, SessionContext, VoiceSessionPort, VoiceStatusDto,
};

use crate::backend::{
    CaptureBackend, CaptureFault, CaptureSignal, OutputSignal, PlaybackBackend, SynthesisBackend,
};
use crate::controller::{
    ControllerEvent, Effect, SessionConfig, SessionState, VoiceMode, reduce,
};
use crate::gate::{MicrophoneAccess, ReadinessGate};
use crate::output::OutputSelector;

/// The injected collaborators a session operates on.
///
/// Production wiring uses `HttpChatClient`, a platform capture engine,
/// `RodioPlayback`, and a platform synthesizer; tests wire scripted fakes
/// that emit controlled (including deliberately out-of-order) sequences.
pub struct SessionBackends {
    /// Remote conversational backend.
    pub chat: Arc<dyn ChatPort>,
    /// Speech-to-text capture engine.
    pub capture: Arc<dyn CaptureBackend>,
    /// Local text-to-speech engine.
    pub synthesis: Arc<dyn SynthesisBackend>,
    /// Byte-payload audio playback.
    pub playback: Arc<dyn PlaybackBackend>,
    /// Microphone permission check.
    pub microphone: Arc<dyn MicrophoneAccess>,
}

/// One voice conversation session.
///
/// Created when the voice interface opens, closed (explicitly or on drop)
/// when it closes. Share it as `Arc<VoiceSession>` (or through
/// `Arc<dyn VoiceSessionPort>`).
pub struct VoiceSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: Mutex<SessionState>,
    config: SessionConfig,
    chat: Arc<dyn ChatPort>,
    capture: Arc<dyn CaptureBackend>,
    output: OutputSelector,
    gate: ReadinessGate,
    emitter: Arc<dyn AppEventEmitter>,
}

impl VoiceSession {
    /// Create a session over the given backends.
    ///
    /// `context` carries the surrounding application's session/user ids;
    /// the session id inside it is updated as replies arrive and readable
    /// back through [`VoiceSessionPort::status`].
    #[must_use]
    pub fn new(
        config: SessionConfig,
        context: SessionContext,
        backends: SessionBackends,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        let output = OutputSelector::new(
            backends.playback,
            backends.synthesis,
            config.capture.locale.clone(),
        );
        Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState::new(context)),
                config,
                chat: backends.chat,
                capture: backends.capture,
                output,
                gate: ReadinessGate::new(backends.microphone),
                emitter,
            }),
        }
    }

    /// Current mode, for callers that don't need the full status DTO.
    #[must_use]
    pub fn mode(&self) -> VoiceMode {
        self.inner.lock_state().mode
    }
}

#[async_trait]
impl VoiceSessionPort for VoiceSession {
    async fn request_start(&self) {
        self.inner.apply(ControllerEvent::StartRequested);
    }

    async fn close(&self) {
        self.inner.apply(ControllerEvent::CloseRequested);
    }

    async fn status(&self) -> VoiceStatusDto {
        let state = self.inner.lock_state();
        VoiceStatusDto {
            mode: state.mode.label().to_owned(),
            session_id: state.context.session_id.clone(),
            last_transcript: state.transcript.clone(),
            closed: state.closed,
        }
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        // Tear down capture and output so late platform callbacks land on
        // a bumped generation. Close effects are all synchronous, so this
        // is safe outside a runtime.
        if !self.inner.lock_state().closed {
            self.inner.apply(ControllerEvent::CloseRequested);
        }
    }
}

impl SessionInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state mutex poisoned")
    }

    /// Run one event through the reducer, then execute its effects.
    fn apply(self: &Arc<Self>, event: ControllerEvent) {
        let effects = {
            let mut state = self.lock_state();
            let (next, effects) = reduce(&state, event, &self.config);
            *state = next;
            effects
        };
        for effect in effects {
            self.perform(effect);
        }
    }

    fn perform(self: &Arc<Self>, effect: Effect) {
        match effect {
            Effect::RequestReadiness { generation } => {
                let inner = Arc::clone(self);
                tokio::spawn(async move {
                    let granted = inner.gate.ensure_ready(&inner.output).await;
                    inner.apply(ControllerEvent::ReadinessResolved {
                        generation,
                        granted,
                    });
                });
            }

            Effect::StartCapture { generation } => self.start_capture(generation),

            Effect::AbortCapture => self.capture.abort(),

            Effect::SendChat {
                generation,
                message,
                context,
            } => {
                let inner = Arc::clone(self);
                tokio::spawn(async move {
                    let outcome = tokio::time::timeout(
                        inner.config.reply_timeout,
                        inner.chat.send(&message, &context),
                    )
                    .await;
                    let event = match outcome {
                        Ok(Ok(reply)) => ControllerEvent::ChatCompleted { generation, reply },
                        Ok(Err(e)) => ControllerEvent::ChatFailed {
                            generation,
                            error: e.to_string(),
                        },
                        Err(_) => ControllerEvent::ChatFailed {
                            generation,
                            error: ChatPortError::Timeout.to_string(),
                        },
                    };
                    inner.apply(event);
                });
            }

            Effect::StartOutput {
                generation,
                request,
            } => {
                let (tx, mut rx) = mpsc::unbounded_channel::<OutputSignal>();
                let inner = Arc::clone(self);
                tokio::spawn(async move {
                    while let Some(signal) = rx.recv().await {
                        inner.apply(ControllerEvent::Output { generation, signal });
                    }
                });
                if let Err(e) = self.output.start(request, tx) {
                    // Start failure resolves like any other output error.
                    self.apply(ControllerEvent::Output {
                        generation,
                        signal: OutputSignal::Errored {
                            message: e.to_string(),
                        },
                    });
                }
            }

            Effect::CancelOutput => self.output.cancel(),

            Effect::Publish(event) => self.emitter.emit(event),
        }
    }

    /// Open a capture cycle: forward its signals stamped with `generation`
    /// and arm the watchdog that bounds the cycle's duration.
    fn start_capture(self: &Arc<Self>, generation: u64) {
        let (tx, mut rx) = mpsc::unbounded_channel::<CaptureSignal>();

        if let Err(e) = self.capture.start(&self.config.capture, tx) {
            tracing::warn!(error = %e, "Capture engine refused to start");
            self.apply(ControllerEvent::Capture {
                generation,
                signal: CaptureSignal::Faulted {
                    fault: CaptureFault::Unavailable,
                },
            });
            return;
        }

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                inner.apply(ControllerEvent::Capture { generation, signal });
            }
        });

        // Watchdog: a synthetic generation-tagged "ended". Inert if the
        // cycle resolved (or a new one started) before it fires.
        let inner = Arc::clone(self);
        let timeout = self.config.capture_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            inner.apply(ControllerEvent::Capture {
                generation,
                signal: CaptureSignal::Ended,
            });
        });
    }
}
