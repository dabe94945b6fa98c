//! Typed rows of the two relations.

use serde::{Deserialize, Serialize};
use vrl_types::{DataType, RecordId, Timestamp};

/// One row of the history relation: a single immutable version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRow {
    pub sequence: u64,
    pub id: RecordId,
    pub data_type: DataType,
    pub payload: String,
    pub timestamp: Timestamp,
}

/// One row of the current-existence index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    /// Assigned when the entity (re)entered the index; fixes its page order.
    pub sequence: u64,
    pub id: RecordId,
    pub data_type: DataType,
}

/// Index rows of one data type on either side of an anchor sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexWindow {
    /// Rows with a sequence strictly below the anchor.
    pub before: u64,
    /// Rows with a sequence strictly above the anchor.
    pub after: u64,
}

/// Aggregate sizes of both relations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub version_count: u64,
    pub index_count: u64,
    /// Highest history sequence (0 if empty).
    pub max_sequence: u64,
}
