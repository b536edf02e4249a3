//! Request capture core: derive log attributes from an inbound request and
//! persist them as an append-only record through a pluggable storage.

pub mod config;
pub mod error;
pub mod extract;
pub mod factory;
pub mod identity;
pub mod lifecycle;
pub mod record;
pub mod request;
pub mod storage;

pub use error::StorageError;
pub use extract::RequestAttributeExtractor;
pub use factory::LogRecordFactory;
pub use identity::Identity;
pub use record::{NewRequestLog, RequestLogFields, RequestLogRecord};
pub use request::InboundRequest;
pub use storage::RequestLogStorage;
