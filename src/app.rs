//! Application struct that encapsulates server assembly and serving logic.

use crate::cli::RunArgs;
use arc_swap::ArcSwap;
use reqlog_core::RequestLogStorage;
use reqlog_core::config::{Config, ConfigWatcher, StorageConfig};
use reqlog_core::lifecycle::signal::SignalHandler;
use reqlog_core::lifecycle::{ForegroundLifecycle, Lifecycle};
use reqlog_core::storage::{JsonLinesStore, MemoryStore};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub struct Application {
    config: Arc<ArcSwap<Config>>,
    app_router: axum::Router,
    config_path: String,
    lifecycle: Arc<dyn Lifecycle>,
    shutdown_timeout: u64,
}

impl Application {
    /// Build the application from CLI args: load config, open the request log
    /// storage, and assemble the router.
    pub fn build(args: &RunArgs) -> anyhow::Result<Self> {
        let mut config = Config::load(&args.config).unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to load config from '{}': {e}, using defaults",
                args.config
            );
            Config::default()
        });

        // CLI overrides
        if let Some(ref host) = args.host {
            config.host = host.clone();
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        if args.capture {
            config.request_log.enabled = true;
        }

        let storage = open_storage(&config.request_log.storage)?;
        tracing::info!(
            "Request capture {}, storage {:?}, {} api users",
            if config.request_log.enabled {
                "enabled"
            } else {
                "disabled"
            },
            config.request_log.storage,
            config.api_users.len(),
        );

        let config = Arc::new(ArcSwap::from_pointee(config));
        let state = reqlog_server::AppState::new(config.clone(), storage);
        let app_router = reqlog_server::build_router(state);

        Ok(Self {
            config,
            app_router,
            config_path: args.config.clone(),
            lifecycle: Arc::new(ForegroundLifecycle),
            shutdown_timeout: args.shutdown_timeout,
        })
    }

    /// Serve HTTP, handle signals, and drain gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let Self {
            config,
            app_router,
            config_path,
            lifecycle,
            shutdown_timeout,
        } = self;

        // Start config file watcher; a missing file just disables hot reload
        let _watcher = match ConfigWatcher::start(config_path.clone(), config.clone(), |new_cfg| {
            tracing::info!(
                "Config reloaded: category '{}', label '{}', {} api users",
                new_cfg.request_log.category,
                new_cfg.request_log.label,
                new_cfg.api_users.len(),
            );
        }) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!("Config hot reload unavailable for '{config_path}': {e}");
                None
            }
        };

        let (signal_handler, shutdown_rx) = SignalHandler::new();

        // SIGHUP reload function
        let reload_config = config.clone();
        let reload_path = config_path.clone();
        let reload_lifecycle = lifecycle.clone();
        let reload_fn = move || {
            reload_lifecycle.on_reloading();
            match Config::load(&reload_path) {
                Ok(new_cfg) => {
                    reload_config.store(Arc::new(new_cfg));
                    reload_lifecycle.on_reloaded();
                }
                Err(e) => {
                    tracing::error!("SIGHUP config reload failed: {e}");
                }
            }
        };

        tokio::spawn(signal_handler.run(reload_fn));

        let addr = {
            let cfg = config.load();
            format!("{}:{}", cfg.host, cfg.port)
        };
        serve_http(&addr, app_router, shutdown_rx, &*lifecycle, shutdown_timeout).await?;

        tracing::info!("Server shut down.");
        Ok(())
    }
}

fn open_storage(storage: &StorageConfig) -> anyhow::Result<Arc<dyn RequestLogStorage>> {
    let storage: Arc<dyn RequestLogStorage> = match storage {
        StorageConfig::Memory => Arc::new(MemoryStore::new()),
        StorageConfig::Jsonl { path } => Arc::new(JsonLinesStore::open(path)?),
    };
    Ok(storage)
}

async fn serve_http(
    addr: &str,
    app_router: axum::Router,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
    lifecycle: &dyn Lifecycle,
    shutdown_timeout: u64,
) -> anyhow::Result<()> {
    tracing::info!("Starting HTTP server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    lifecycle.on_ready();

    let mut graceful_rx = shutdown_rx.clone();
    let shutdown = async move {
        let _ = graceful_rx.wait_for(|v| *v).await;
    };

    // Peer addresses feed the client address fallback
    let server = axum::serve(
        listener,
        app_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown);

    tokio::select! {
        result = server.into_future() => result?,
        () = drain_deadline(shutdown_rx, Duration::from_secs(shutdown_timeout)) => {
            tracing::warn!("Connections still open after {shutdown_timeout}s, shutting down anyway");
        }
    }

    lifecycle.on_stopping();
    Ok(())
}

/// Resolves `timeout` after shutdown is signalled.
async fn drain_deadline(mut shutdown_rx: tokio::sync::watch::Receiver<bool>, timeout: Duration) {
    if shutdown_rx.wait_for(|v| *v).await.is_err() {
        // Sender gone without a signal: no shutdown will be requested.
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_deadline_waits_for_signal() {
        let (tx, rx) = tokio::sync::watch::channel(false);
        let deadline = drain_deadline(rx, Duration::ZERO);
        tokio::pin!(deadline);

        let early = tokio::time::timeout(Duration::from_millis(50), &mut deadline).await;
        assert!(early.is_err());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), deadline)
            .await
            .expect("deadline should fire once shutdown is signalled");
    }

    #[tokio::test]
    async fn test_drain_deadline_honours_timeout() {
        let (tx, rx) = tokio::sync::watch::channel(false);
        tx.send(true).unwrap();

        let started = tokio::time::Instant::now();
        drain_deadline(rx, Duration::from_millis(200)).await;
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
