use crate::error::StorageError;
use crate::extract::RequestAttributeExtractor;
use crate::identity::Identity;
use crate::request::InboundRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_SESSION_KEY_LEN: usize = 40;
pub const MAX_HTTP_METHOD_LEN: usize = 10;
pub const MAX_REMOTE_ADDRESS_LEN: usize = 100;
pub const MAX_TAG_LEN: usize = 100;

/// Characters of the path shown in a record's display form.
const DISPLAY_PATH_LEN: usize = 100;

/// Snapshot of the request attributes worth logging.
///
/// This is the reusable field-set: embed it (with `#[serde(flatten)]`) in any
/// entity that should carry request metadata alongside its own data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogFields {
    /// `None` for anonymous requests.
    pub identity: Option<Identity>,
    pub session_key: String,
    pub http_method: String,
    pub request_path: String,
    pub query_string: String,
    pub user_agent: String,
    pub referer: String,
    pub remote_address: String,
    /// Set once, when the snapshot is taken.
    pub timestamp: DateTime<Utc>,
}

impl RequestLogFields {
    /// Run every resolver against `request` and stamp the current time.
    pub fn from_request<R: InboundRequest + ?Sized>(
        extractor: &RequestAttributeExtractor,
        request: &R,
    ) -> Self {
        Self {
            identity: extractor.resolve_identity(request),
            session_key: extractor.resolve_session_key(request),
            http_method: extractor.resolve_http_method(request),
            request_path: extractor.resolve_path(request),
            query_string: extractor.resolve_query_string(request),
            user_agent: extractor.resolve_user_agent(request),
            referer: extractor.resolve_referer(request),
            remote_address: extractor.resolve_remote_address(request),
            timestamp: Utc::now(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    /// Check the column-width limits a storage enforces.
    pub fn validate(&self) -> Result<(), StorageError> {
        check_len("session_key", &self.session_key, MAX_SESSION_KEY_LEN)?;
        check_len("http_method", &self.http_method, MAX_HTTP_METHOD_LEN)?;
        check_len("remote_address", &self.remote_address, MAX_REMOTE_ADDRESS_LEN)?;
        Ok(())
    }
}

/// A request log that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequestLog {
    #[serde(flatten)]
    pub fields: RequestLogFields,
    /// Used to filter and group logs.
    pub category: String,
    /// Used to identify individual logs.
    pub label: String,
}

impl NewRequestLog {
    pub fn new(
        fields: RequestLogFields,
        category: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            fields,
            category: category.into(),
            label: label.into(),
        }
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        self.fields.validate()?;
        check_len("category", &self.category, MAX_TAG_LEN)?;
        check_len("label", &self.label, MAX_TAG_LEN)?;
        Ok(())
    }
}

/// A stored request log. Storages never hand out a way to modify one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogRecord {
    /// Assigned by the storage on insert.
    pub id: u64,
    #[serde(flatten)]
    pub log: NewRequestLog,
}

impl RequestLogRecord {
    pub fn new(id: u64, log: NewRequestLog) -> Self {
        Self { id, log }
    }

    pub fn fields(&self) -> &RequestLogFields {
        &self.log.fields
    }

    pub fn category(&self) -> &str {
        &self.log.category
    }

    pub fn label(&self) -> &str {
        &self.log.label
    }
}

impl fmt::Display for RequestLogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields();
        let path: String = fields.request_path.chars().take(DISPLAY_PATH_LEN).collect();
        match &fields.identity {
            Some(identity) => write!(
                f,
                "Logged request by {identity} to '{path}' at {}",
                fields.timestamp
            ),
            None => write!(
                f,
                "Logged anonymous request to '{path}' at {}",
                fields.timestamp
            ),
        }
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), StorageError> {
    if value.chars().count() > max {
        return Err(StorageError::Constraint { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::testing::TestRequest;

    fn fields_for(req: &TestRequest) -> RequestLogFields {
        RequestLogFields::from_request(&RequestAttributeExtractor::new(), req)
    }

    #[test]
    fn test_from_request_populates_every_field() {
        let req = TestRequest::get("/?a=b").header("User-Agent", "Mozilla/5.0");
        let before = Utc::now();
        let fields = fields_for(&req);
        let after = Utc::now();

        assert!(fields.is_anonymous());
        assert_eq!(fields.session_key, "");
        assert_eq!(fields.http_method, "GET");
        assert_eq!(fields.request_path, "/");
        assert_eq!(fields.query_string, "a=b");
        assert_eq!(fields.user_agent, "Mozilla/5.0");
        assert_eq!(fields.referer, "");
        assert_eq!(fields.remote_address, "127.0.0.1");
        assert!(before <= fields.timestamp && fields.timestamp <= after);
    }

    #[test]
    fn test_validate_limits() {
        let req = TestRequest::get("/").session(&"s".repeat(MAX_SESSION_KEY_LEN));
        let log = NewRequestLog::new(fields_for(&req), "c".repeat(MAX_TAG_LEN), "");
        assert!(log.validate().is_ok());

        let req = TestRequest::get("/").session(&"s".repeat(MAX_SESSION_KEY_LEN + 1));
        let err = NewRequestLog::new(fields_for(&req), "", "")
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Constraint {
                field: "session_key",
                max: MAX_SESSION_KEY_LEN
            }
        ));

        let log = NewRequestLog::new(fields_for(&TestRequest::get("/")), "", "l".repeat(101));
        assert!(matches!(
            log.validate(),
            Err(StorageError::Constraint { field: "label", .. })
        ));

        let req = TestRequest::new("PROPPATCHXX", "/");
        assert!(matches!(
            fields_for(&req).validate(),
            Err(StorageError::Constraint { field: "http_method", .. })
        ));
    }

    #[test]
    fn test_display_anonymous_and_authenticated() {
        let anon = RequestLogRecord::new(
            1,
            NewRequestLog::new(fields_for(&TestRequest::get("/docs")), "", ""),
        );
        assert!(
            anon.to_string()
                .starts_with("Logged anonymous request to '/docs' at ")
        );

        let req = TestRequest::get("/docs").user(Identity::new("7", "bob"));
        let authed = RequestLogRecord::new(2, NewRequestLog::new(fields_for(&req), "", ""));
        assert!(
            authed
                .to_string()
                .starts_with("Logged request by bob to '/docs' at ")
        );
    }

    #[test]
    fn test_display_truncates_long_paths() {
        let long_path = format!("/{}", "x".repeat(150));
        let record = RequestLogRecord::new(
            1,
            NewRequestLog::new(fields_for(&TestRequest::get(&long_path)), "", ""),
        );
        let shown = record.to_string();
        assert!(shown.contains(&format!("'{}'", &long_path[..DISPLAY_PATH_LEN])));
    }

    #[test]
    fn test_record_serializes_flat() {
        let req = TestRequest::get("/x").user(Identity::new("1", "alice"));
        let record = RequestLogRecord::new(9, NewRequestLog::new(fields_for(&req), "foo", "bar"));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], 9);
        assert_eq!(value["category"], "foo");
        assert_eq!(value["request_path"], "/x");
        assert_eq!(value["identity"]["username"], "alice");

        let back: RequestLogRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
