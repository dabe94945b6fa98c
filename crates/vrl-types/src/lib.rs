//! Foundation types for the Versioned Record Ledger (VRL).
//!
//! This crate provides the identity, temporal, and capability types shared by
//! every other VRL crate. It has no storage dependencies.
//!
//! # Key Types
//!
//! - [`RecordId`] -- Stable UUID identity of a logical entity across versions
//! - [`DataType`] -- Tag naming the schema family of a payload
//! - [`Timestamp`] -- Store-assigned insertion time (microsecond precision)
//! - [`Identify`] / [`Apply`] -- Capabilities a domain value exposes to the ledger
//! - [`Node`] -- Embeddable metadata block implementing [`Apply`]

pub mod capability;
pub mod error;
pub mod identity;
pub mod payload;
pub mod temporal;

pub use capability::{Apply, HasNode, Identify, Node};
pub use error::TypeError;
pub use identity::{DataType, RecordId};
pub use payload::{is_tombstone, TOMBSTONE};
pub use temporal::Timestamp;
