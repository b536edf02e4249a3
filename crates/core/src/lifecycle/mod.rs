//! Process lifecycle: logging setup, signal handling, and readiness events.

pub mod logging;
pub mod signal;

/// Observer for server lifecycle events.
pub trait Lifecycle: Send + Sync {
    /// Called when the listener is bound and accepting connections.
    fn on_ready(&self);
    /// Called when a configuration reload begins.
    fn on_reloading(&self);
    /// Called when a configuration reload completes.
    fn on_reloaded(&self);
    /// Called when the server is about to stop.
    fn on_stopping(&self);
}

/// Foreground lifecycle — logs events only.
pub struct ForegroundLifecycle;

impl Lifecycle for ForegroundLifecycle {
    fn on_ready(&self) {
        tracing::info!("Service ready");
    }

    fn on_reloading(&self) {
        tracing::info!("Service reloading configuration...");
    }

    fn on_reloaded(&self) {
        tracing::info!("Service configuration reloaded");
    }

    fn on_stopping(&self) {
        tracing::info!("Service stopping...");
    }
}
