use crate::middleware::session::SessionKey;
use axum::Json;
use axum::extract::Request;
use axum::response::IntoResponse;
use reqlog_core::Identity;

/// GET /whoami — the identity and session attached to this request.
pub async fn whoami(request: Request) -> impl IntoResponse {
    let identity = request.extensions().get::<Identity>();
    let session = request.extensions().get::<SessionKey>().map(SessionKey::as_str);
    Json(serde_json::json!({
        "anonymous": identity.is_none(),
        "identity": identity,
        "session_key": session,
    }))
}
