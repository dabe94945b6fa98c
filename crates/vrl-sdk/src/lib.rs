//! High-level SDK for the Versioned Record Ledger.
//!
//! Wraps the ledger in typed, per-data-type [`Collection`]s with
//! connection-style pages and opaque [`Cursor`]s. This is the main entry
//! point for applications embedding VRL.

pub mod collection;
pub mod cursor;
pub mod document;
pub mod error;

pub use collection::{Collection, Connection, Edge, Entity, PageInfo, Version};
pub use cursor::Cursor;
pub use document::{Document, DEFAULT_DOCUMENT_TYPE};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use vrl_ledger::{Ledger, LedgerError, Record};
pub use vrl_store::StoreConfig;
pub use vrl_types::{Apply, DataType, HasNode, Identify, Node, RecordId, Timestamp};
