//! Backing relation store for the Versioned Record Ledger.
//!
//! The ledger persists into two relations:
//!
//! - `record` -- the full, append-only version history. One row per version.
//! - `record_index` -- the current-existence index. At most one row per id,
//!   present only while the entity's latest version is live.
//!
//! # Storage Backends
//!
//! All backends implement the [`RelationStore`] trait:
//!
//! - [`SqliteStore`] -- SQLite-backed store, on disk (WAL) or in memory
//!
//! # Design Rules
//!
//! 1. Every trait method issues exactly one statement and is atomic on its own.
//! 2. The store assigns `sequence` and `timestamp`; callers never supply them.
//! 3. History rows are never updated or deleted (enforced by schema triggers).
//! 4. The store never interprets payloads beyond comparing them with the
//!    tombstone marker during reconciliation queries.

pub mod config;
pub mod error;
pub mod row;
pub mod sqlite;
pub mod traits;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use row::{IndexRow, IndexWindow, StoreStats, VersionRow};
pub use sqlite::{SqliteStore, SCHEMA_SQL};
pub use traits::RelationStore;
