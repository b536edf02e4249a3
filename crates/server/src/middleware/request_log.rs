use crate::AppState;
use crate::error::ServerError;
use crate::request::AxumRequest;
use axum::extract::{Request, State};
use axum::{middleware::Next, response::Response};
use reqlog_core::record::MAX_HTTP_METHOD_LEN;

/// Middleware that stores one request log per request before handling it.
///
/// Category, label and forwarding header come from the live config. A failed
/// write is returned to the client and the inner handler does not run.
/// Requests whose method is too long to store are passed through uncaptured.
pub async fn request_log_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if request.method().as_str().len() > MAX_HTTP_METHOD_LEN {
        tracing::warn!(
            method_len = request.method().as_str().len(),
            path = %request.uri().path(),
            "Request not captured: method exceeds {MAX_HTTP_METHOD_LEN} characters"
        );
        return Ok(next.run(request).await);
    }

    let (logger, category, label) = {
        let config = state.config.load();
        (
            state.request_logger(&config),
            config.request_log.category.clone(),
            config.request_log.label.clone(),
        )
    };

    let record = logger
        .log(&AxumRequest::new(&request), &category, &label)
        .inspect_err(|e| {
            tracing::error!(
                method = %request.method(),
                path = %request.uri().path(),
                "Request log write failed: {e}"
            );
        })?;

    tracing::debug!(
        id = record.id,
        remote_address = %record.fields().remote_address,
        anonymous = record.fields().is_anonymous(),
        "Request captured"
    );

    Ok(next.run(request).await)
}
