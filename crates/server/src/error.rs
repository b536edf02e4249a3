use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqlog_core::StorageError;
use serde_json::json;

/// Errors surfaced to HTTP clients by the server layer.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("request log write failed: {0}")]
    Storage(#[from] StorageError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Storage(StorageError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Self::Storage(StorageError::Constraint { .. }) => "constraint_violation",
            Self::Storage(StorageError::Unavailable(_)) => "storage_unavailable",
            Self::Storage(StorageError::Serialization(_)) => "serialization_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": "storage_error",
                "code": self.error_code(),
            }
        });

        (
            status,
            [("content-type", "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
