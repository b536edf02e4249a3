pub mod auth;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod request;

use arc_swap::ArcSwap;
use axum::{Router, middleware as axum_mw};
use reqlog_core::config::Config;
use reqlog_core::{LogRecordFactory, RequestAttributeExtractor, RequestLogStorage};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<Config>>,
    pub storage: Arc<dyn RequestLogStorage>,
}

impl AppState {
    pub fn new(config: Arc<ArcSwap<Config>>, storage: Arc<dyn RequestLogStorage>) -> Self {
        Self { config, storage }
    }

    /// Request logger for `config`, resolving client addresses through its
    /// forwarding header.
    pub fn request_logger(&self, config: &Config) -> LogRecordFactory<dyn RequestLogStorage> {
        let extractor = RequestAttributeExtractor::with_forwarded_header(
            config.request_log.forwarded_header.as_str(),
        );
        LogRecordFactory::with_extractor(extractor, self.storage.clone())
    }
}

pub fn build_router(state: AppState) -> Router {
    let capture = state.config.load().request_log.enabled;

    let mut router = Router::new()
        .route("/health", axum::routing::get(handler::health::health))
        .route("/whoami", axum::routing::get(handler::whoami::whoami))
        .fallback(handler::health::not_found);

    // Capture runs innermost so session and identity are already attached.
    if capture {
        router = router.layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::request_log::request_log_middleware,
        ));
    } else {
        tracing::info!("Request logging disabled");
    }

    // Global middleware layers (outer → inner: trace, session, auth)
    router
        .layer(axum_mw::from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::session::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
