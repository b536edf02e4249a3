//! Shutdown (SIGTERM/SIGINT) and reload (SIGHUP) signal dispatch.

use tokio::sync::watch;

/// Listens for OS signals and flips a shared shutdown flag.
pub struct SignalHandler {
    shutdown_tx: watch::Sender<bool>,
}

impl SignalHandler {
    /// Create a handler and a receiver that turns `true` on shutdown.
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    /// Wait for signals until shutdown is requested.
    ///
    /// SIGHUP calls `reload_fn` and keeps waiting. If a handler cannot be
    /// installed the error is logged and shutdown is triggered immediately.
    pub async fn run<F>(self, reload_fn: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match (
                signal(SignalKind::terminate()),
                signal(SignalKind::hangup()),
            ) {
                (Ok(mut sigterm), Ok(mut sighup)) => loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("Received SIGINT, initiating shutdown...");
                            break;
                        }
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, initiating shutdown...");
                            break;
                        }
                        _ = sighup.recv() => {
                            tracing::info!("Received SIGHUP, reloading configuration...");
                            reload_fn();
                        }
                    }
                },
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!("Failed to install signal handlers: {e}");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = &reload_fn;
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
            } else {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
        }

        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_handler_construction() {
        let (handler, rx) = SignalHandler::new();
        assert!(!*rx.borrow());
        let _ = handler.shutdown_tx.send(true);
        assert!(*rx.borrow());
    }
}
