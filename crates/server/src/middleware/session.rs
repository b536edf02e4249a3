use crate::AppState;
use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::{middleware::Next, response::Response};
use reqlog_core::record::MAX_SESSION_KEY_LEN;

/// Session identifier attached to a request as an axum `Extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Middleware that attaches the session cookie value as a `SessionKey`.
///
/// Empty or oversized values are ignored and the request carries no session.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.config.load().session.cookie_name.clone();

    let key = request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|header| find_cookie(header, &cookie_name))
        .filter(|value| value.len() <= MAX_SESSION_KEY_LEN)
        .map(SessionKey::new);

    if let Some(key) = key {
        request.extensions_mut().insert(key);
    }
    next.run(request).await
}

/// Value of cookie `name` in a `Cookie` header, if present and non-empty.
fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().trim_matches('"'))
        .filter(|v| !v.is_empty())
}
