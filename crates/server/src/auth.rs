use crate::AppState;
use axum::{extract::State, http::Request, middleware::Next, response::Response};

/// Middleware that attaches the `Identity` registered for the request's API key.
///
/// Missing or unknown keys leave the request anonymous; nothing is rejected
/// here.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // Extract token from Authorization: Bearer or x-api-key header
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| {
            request
                .headers()
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
        });
    let presented = token.is_some();
    let identity = token.and_then(|t| state.config.load().identity_for_key(t.trim()).cloned());

    match identity {
        Some(identity) => {
            tracing::trace!(user_id = %identity.user_id, "Request authenticated");
            request.extensions_mut().insert(identity);
        }
        None if presented => tracing::debug!("Unknown API key, treating request as anonymous"),
        None => {}
    }

    next.run(request).await
}
