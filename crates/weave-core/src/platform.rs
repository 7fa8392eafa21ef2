//! Platform hooks for the renderer's runtime.
//!
//! The runtime never blocks or spawns threads itself. When a deferred value
//! becomes ready it asks the host platform to schedule a flush, and the
//! platform answers by calling `Renderer::run_until_idle` on the thread that
//! owns the renderer.

/// Receives flush requests from the runtime.
///
/// Wakers may fire on any thread, so implementations must be thread-safe.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the owner flush ready deferred work soon.
    fn schedule_flush(&self);
}
