use crate::error::StorageError;
use crate::extract::RequestAttributeExtractor;
use crate::record::{NewRequestLog, RequestLogFields, RequestLogRecord};
use crate::request::InboundRequest;
use crate::storage::RequestLogStorage;
use std::sync::Arc;

/// Builds request log records and commits them to a storage.
///
/// Stateless apart from its collaborators: every `log` call snapshots the
/// request and performs exactly one insert. There is no batching,
/// deduplication or retry.
pub struct LogRecordFactory<S: ?Sized> {
    extractor: RequestAttributeExtractor,
    storage: Arc<S>,
}

impl<S: ?Sized> Clone for LogRecordFactory<S> {
    fn clone(&self) -> Self {
        Self {
            extractor: self.extractor.clone(),
            storage: self.storage.clone(),
        }
    }
}

impl<S: RequestLogStorage + ?Sized> LogRecordFactory<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_extractor(RequestAttributeExtractor::new(), storage)
    }

    pub fn with_extractor(extractor: RequestAttributeExtractor, storage: Arc<S>) -> Self {
        Self { extractor, storage }
    }

    pub fn extractor(&self) -> &RequestAttributeExtractor {
        &self.extractor
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Snapshot `request` into an unsaved record. No side effects.
    pub fn build<R: InboundRequest + ?Sized>(
        &self,
        request: &R,
        category: &str,
        label: &str,
    ) -> NewRequestLog {
        NewRequestLog::new(
            RequestLogFields::from_request(&self.extractor, request),
            category,
            label,
        )
    }

    /// Snapshot `request` and store it.
    ///
    /// The timestamp is taken before the write is attempted. Storage errors are
    /// returned as-is.
    pub fn log<R: InboundRequest + ?Sized>(
        &self,
        request: &R,
        category: &str,
        label: &str,
    ) -> Result<RequestLogRecord, StorageError> {
        let log = self.build(request, category, label);
        match self.storage.insert(log) {
            Ok(record) => {
                tracing::debug!(
                    id = record.id,
                    category = %record.category(),
                    path = %record.fields().request_path,
                    "Request log stored"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(
                    category = %category,
                    path = %request.path(),
                    "Failed to store request log: {e}"
                );
                Err(e)
            }
        }
    }

    /// [`log`](Self::log) with an empty category and label.
    pub fn log_request<R: InboundRequest + ?Sized>(
        &self,
        request: &R,
    ) -> Result<RequestLogRecord, StorageError> {
        self.log(request, "", "")
    }
}
