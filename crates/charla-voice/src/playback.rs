//! Audio playback — server-synthesized reply audio via `rodio`.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. Rather than using
//! `unsafe impl Send/Sync`, the stream and its sinks are confined to a
//! dedicated OS thread; [`RodioPlayback`] is the `Send + Sync` proxy that
//! routes every operation through a command channel.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use crate::backend::{OutputSignal, PlaybackBackend};
use crate::error::VoiceError;

// ── Commands ───────────────────────────────────────────────────────

enum PlaybackCommand {
    /// Decode and play an audio payload, replacing any current stream.
    Play {
        audio: Vec<u8>,
        signals: tokio::sync::mpsc::UnboundedSender<OutputSignal>,
        reply: mpsc::Sender<Result<(), VoiceError>>,
    },

    /// Stop playback immediately (fire-and-forget).
    Stop,

    /// Nudge the output device awake with a moment of silence.
    ResumeOutput,

    /// Shut down the audio thread.
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `rodio`-backed [`PlaybackBackend`] for byte payloads (MPEG/WAV).
///
/// One decoded payload plays at a time; `play` replaces the current sink.
/// The ended signal is emitted only when playback drains naturally — a
/// stopped stream stays silent, as the backend contract requires.
pub struct RodioPlayback {
    cmd_tx: mpsc::Sender<PlaybackCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioPlayback {
    /// Spawn the audio thread and open the default output device.
    pub fn new() -> Result<Self, VoiceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlaybackCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), VoiceError>>();

        let thread = thread::Builder::new()
            .name("charla-audio".into())
            .spawn(move || run(&cmd_rx, &init_tx))
            .map_err(|e| VoiceError::OutputStream(format!("failed to spawn audio thread: {e}")))?;

        init_rx.recv().map_err(|_| VoiceError::OutputThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }
}

impl PlaybackBackend for RodioPlayback {
    fn play(
        &self,
        audio: Vec<u8>,
        signals: tokio::sync::mpsc::UnboundedSender<OutputSignal>,
    ) -> Result<(), VoiceError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx
            .send(PlaybackCommand::Play {
                audio,
                signals,
                reply: reply_tx,
            })
            .map_err(|_| VoiceError::OutputThreadDied)?;
        reply_rx.recv().map_err(|_| VoiceError::OutputThreadDied)?
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(PlaybackCommand::Stop);
    }

    fn resume_output(&self) {
        let _ = self.cmd_tx.send(PlaybackCommand::ResumeOutput);
    }
}

impl Drop for RodioPlayback {
    fn drop(&mut self) {
        // Best-effort shutdown — the thread may already be dead.
        let _ = self.cmd_tx.send(PlaybackCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

// ── Audio thread ───────────────────────────────────────────────────

/// The currently playing sink plus its "still live" flag.
///
/// The flag distinguishes a natural drain (emit `Ended`) from an explicit
/// stop (emit nothing) inside the completion watcher.
type ActiveSink = (Arc<Sink>, Arc<AtomicBool>);

/// Body of the dedicated audio thread. Owns the `OutputStream` for its
/// entire lifetime — it never crosses a thread boundary.
fn run(cmd_rx: &mpsc::Receiver<PlaybackCommand>, init_tx: &mpsc::Sender<Result<(), VoiceError>>) {
    let (stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = init_tx.send(Err(VoiceError::OutputStream(e.to_string())));
            return;
        }
    };
    // Keep the stream alive for the lifetime of the thread.
    let _stream = stream;

    if init_tx.send(Ok(())).is_err() {
        return;
    }
    tracing::info!("Audio playback initialized on default output device");

    let mut active: Option<ActiveSink> = None;

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            PlaybackCommand::Play {
                audio,
                signals,
                reply,
            } => {
                stop_active(&mut active);
                let _ = reply.send(start_play(&stream_handle, audio, signals, &mut active));
            }

            PlaybackCommand::Stop => stop_active(&mut active),

            PlaybackCommand::ResumeOutput => resume_output(&stream_handle),

            PlaybackCommand::Shutdown => break,
        }
    }

    stop_active(&mut active);
    tracing::debug!("Audio thread shutting down");
}

/// Decode `audio` and start it on a fresh sink, with a completion watcher
/// that emits `Ended` when the sink drains naturally.
fn start_play(
    stream_handle: &OutputStreamHandle,
    audio: Vec<u8>,
    signals: tokio::sync::mpsc::UnboundedSender<OutputSignal>,
    active: &mut Option<ActiveSink>,
) -> Result<(), VoiceError> {
    let source = rodio::Decoder::new(Cursor::new(audio))
        .map_err(|e| VoiceError::AudioDecode(e.to_string()))?;

    let sink =
        Sink::try_new(stream_handle).map_err(|e| VoiceError::OutputStream(e.to_string()))?;
    sink.append(source.convert_samples::<f32>());

    let _ = signals.send(OutputSignal::Started);
    tracing::debug!("Audio playback started");

    let sink = Arc::new(sink);
    let playing = Arc::new(AtomicBool::new(true));

    // `sleep_until_end` blocks until the queue drains or `stop()` drops the
    // internal sources, so the watcher wakes promptly either way.
    let watcher_sink = Arc::clone(&sink);
    let watcher_flag = Arc::clone(&playing);
    thread::spawn(move || {
        watcher_sink.sleep_until_end();
        if watcher_flag.swap(false, Ordering::SeqCst) {
            tracing::debug!("Playback finished naturally");
            let _ = signals.send(OutputSignal::Ended);
        }
    });

    *active = Some((sink, playing));
    Ok(())
}

/// Stop the current sink, if any, without emitting a signal.
fn stop_active(active: &mut Option<ActiveSink>) {
    if let Some((sink, playing)) = active.take() {
        playing.store(false, Ordering::SeqCst);
        sink.stop();
        tracing::debug!("Audio playback stopped");
    }
}

/// Play a short burst of silence through a transient sink.
///
/// Autoplay-restricted platforms unlock the output device on the first
/// user-gesture-driven sound; the readiness gate triggers this once.
fn resume_output(stream_handle: &OutputStreamHandle) {
    match Sink::try_new(stream_handle) {
        Ok(sink) => {
            let silence = rodio::source::Zero::<f32>::new(1, 44_100)
                .take_duration(Duration::from_millis(20));
            sink.append(silence);
            sink.detach();
            tracing::debug!("Output device woken with silence");
        }
        Err(e) => tracing::warn!(error = %e, "Could not wake output device"),
    }
}
