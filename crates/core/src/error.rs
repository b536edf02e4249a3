/// Failures raised by a request log storage.
///
/// The factory never recovers from these; they reach the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("constraint violated: {field} exceeds {max} characters")]
    Constraint { field: &'static str, max: usize },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {e}"))
    }
}
