//! Storage backends for request log records.

mod jsonl;
mod memory;

pub use jsonl::JsonLinesStore;
pub use memory::MemoryStore;

use crate::error::StorageError;
use crate::record::{NewRequestLog, RequestLogRecord};

/// Durable, append-only destination for request logs.
///
/// `insert` is a single atomic write: it either stores the record and returns
/// it with its assigned id, or fails and leaves nothing behind.
pub trait RequestLogStorage: Send + Sync {
    fn insert(&self, log: NewRequestLog) -> Result<RequestLogRecord, StorageError>;
}
