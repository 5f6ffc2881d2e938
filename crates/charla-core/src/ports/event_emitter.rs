//! Event emitter trait for cross-crate event broadcasting.
//!
//! The voice session publishes [`AppEvent`]s through this abstraction;
//! implementations own the transport (in-process channels, SSE, a GUI
//! event loop). Keeping the trait here prevents channel types from
//! becoming part of the public API surface.

use crate::events::AppEvent;

/// Trait for emitting application events.
///
/// # Implementations
///
/// - [`NoopEmitter`] — for tests and headless contexts that don't observe events
/// - Adapter-specific implementations (UI bridges, SSE, …)
pub trait AppEventEmitter: Send + Sync {
    /// Emit an application event.
    ///
    /// Implementations should buffer or forward asynchronously; this method
    /// must not block the caller.
    fn emit(&self, event: AppEvent);

    /// Clone this emitter into a boxed trait object.
    ///
    /// Enables cloning `Arc<dyn AppEventEmitter>` without requiring the
    /// underlying type to implement `Clone`.
    fn clone_box(&self) -> Box<dyn AppEventEmitter>;
}

/// A no-op event emitter for tests and headless contexts.
///
/// Discards every event. Suitable wherever event observation is optional.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AppEventEmitter for NoopEmitter {
    fn emit(&self, _event: AppEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}
