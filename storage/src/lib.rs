//! Read path of the eventq persistent queue
//!
//! This crate provides the record cursor walking a queue's chain of pages
//! inside a transaction, and the structured error type used by every layer
//! of the storage engine.

pub mod access;
pub mod cursor;
pub mod error;
pub mod page;
pub mod tx;

pub use access::{Access, Config};
pub use cursor::{Position, TxCursor};
pub use error::{Error, ErrorContext, ErrorKind, MultiError};
pub use page::{PageHeader, PageId, RecordHeader};
pub use tx::{PageHandle, Transaction, TxId};

pub type Result<T> = std::result::Result<T, Error>;
