use super::RequestLogStorage;
use crate::error::StorageError;
use crate::record::{NewRequestLog, RequestLogRecord};
use std::sync::RwLock;

/// Append-only in-process store. Ids start at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<RequestLogRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored record, oldest first.
    pub fn records(&self) -> Vec<RequestLogRecord> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequestLogStorage for MemoryStore {
    fn insert(&self, log: NewRequestLog) -> Result<RequestLogRecord, StorageError> {
        log.validate()?;
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))?;
        let record = RequestLogRecord::new(records.len() as u64 + 1, log);
        records.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::RequestAttributeExtractor;
    use crate::record::RequestLogFields;
    use crate::request::testing::TestRequest;

    fn make_log(category: &str) -> NewRequestLog {
        let fields =
            RequestLogFields::from_request(&RequestAttributeExtractor::new(), &TestRequest::get("/"));
        NewRequestLog::new(fields, category, "")
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let first = store.insert(make_log("a")).unwrap();
        let second = store.insert(make_log("b")).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[1].category(), "b");
    }

    #[test]
    fn test_rejected_insert_stores_nothing() {
        let store = MemoryStore::new();
        let err = store.insert(make_log(&"c".repeat(101))).unwrap_err();

        assert!(matches!(err, StorageError::Constraint { field: "category", .. }));
        assert!(store.is_empty());
    }
}
