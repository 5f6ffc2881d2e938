//! Readiness gate — microphone access and output-device wake-up.
//!
//! Platforms with autoplay restrictions refuse to open an audio output
//! stream until a user gesture, and speech capture needs microphone
//! permission. Both are settled here, inside the first start request,
//! before the controller transitions to listening.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::output::OutputSelector;

/// Platform microphone permission check.
///
/// The platform caches the user's answer, so implementations are expected
/// to be idempotent — the gate delegates on every start request.
#[async_trait]
pub trait MicrophoneAccess: Send + Sync {
    /// Request microphone access; `false` means denied.
    async fn request_access(&self) -> bool;
}

/// A [`MicrophoneAccess`] that always grants.
///
/// For tests and embeddings where permission is handled out of band.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

#[async_trait]
impl MicrophoneAccess for AlwaysGranted {
    async fn request_access(&self) -> bool {
        true
    }
}

/// Gate resolved before every listening cycle.
///
/// Wakes the suspended output device at most once per gate (the platform
/// stays unlocked afterwards), then asks for microphone access.
pub struct ReadinessGate {
    microphone: Arc<dyn MicrophoneAccess>,
    output_woken: AtomicBool,
}

impl ReadinessGate {
    /// Create a gate over the given microphone port.
    pub fn new(microphone: Arc<dyn MicrophoneAccess>) -> Self {
        Self {
            microphone,
            output_woken: AtomicBool::new(false),
        }
    }

    /// Resolve the gate; `false` means the start request must not proceed.
    pub async fn ensure_ready(&self, output: &OutputSelector) -> bool {
        if !self.output_woken.swap(true, Ordering::SeqCst) {
            tracing::debug!("Waking suspended audio output");
            output.resume_output();
        }

        let granted = self.microphone.request_access().await;
        if granted {
            tracing::debug!("Microphone access granted");
        } else {
            tracing::info!("Microphone access denied");
        }
        granted
    }
}
