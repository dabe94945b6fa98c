//! Append-only versioned record ledger for the Versioned Record Ledger (VRL).
//!
//! This crate is the heart of VRL. It provides:
//! - [`Ledger`] with versioned `write`, `read`, `history`, `delete`, and
//!   forward-append `restore`
//! - Reverse-chronological cursor pagination (`fetch`) over the
//!   current-existence index
//! - [`ResultSet`], a single-pass record sequence drained with `scan` into
//!   values implementing [`vrl_types::Apply`]
//! - Shape-validated ad hoc read statements (`query`, `query_one`)
//! - Index audit and reconciliation

pub mod error;
pub mod ledger;
pub mod pager;
pub mod query;
pub mod reconcile;
pub mod record;
pub mod result;

pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use query::{QueryShapeViolation, PROJECTION};
pub use reconcile::{IndexEntry, IndexReport};
pub use record::Record;
pub use result::{PageInfo, ResultSet};
