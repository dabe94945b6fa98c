use serde_json::Value;
use vrl_types::{DataType, RecordId, Timestamp};

use crate::error::StoreResult;
use crate::row::{IndexRow, IndexWindow, StoreStats, VersionRow};

/// Backing store for the history relation and the current-existence index.
///
/// All implementations must satisfy these invariants:
/// - Each method is a single atomic statement. Callers composing several
///   methods get no cross-statement atomicity.
/// - `sequence` is assigned on insert, strictly increasing across the whole
///   store, and never reused (including after index rows are removed).
/// - `timestamp` is assigned on insert and strictly increasing per id.
/// - History rows are never updated or removed.
/// - "Latest version" means greatest `timestamp`, ties broken by greatest
///   `sequence`.
pub trait RelationStore: Send + Sync {
    // ---------------------------------------------------------------
    // History relation
    // ---------------------------------------------------------------

    /// Append a version and return it with its assigned sequence and timestamp.
    fn insert_version(
        &self,
        id: &RecordId,
        data_type: &DataType,
        payload: &str,
    ) -> StoreResult<VersionRow>;

    /// Latest version of `id` stored under `data_type`.
    fn latest_version(
        &self,
        id: &RecordId,
        data_type: &DataType,
    ) -> StoreResult<Option<VersionRow>>;

    /// The version of `id` under `data_type` whose timestamp equals `at` exactly.
    fn version_at(
        &self,
        id: &RecordId,
        data_type: &DataType,
        at: Timestamp,
    ) -> StoreResult<Option<VersionRow>>;

    /// All versions of `id`, newest first.
    fn versions(&self, id: &RecordId) -> StoreResult<Vec<VersionRow>>;

    /// Timestamp of the earliest version of `id`.
    fn earliest_timestamp(&self, id: &RecordId) -> StoreResult<Option<Timestamp>>;

    /// Data type of the first version of `id`, `None` if it has no versions.
    fn data_type_of(&self, id: &RecordId) -> StoreResult<Option<DataType>>;

    /// Latest version of each of `ids`, in no particular order.
    ///
    /// Ids without any version are silently absent from the result.
    fn latest_versions_in(&self, ids: &[RecordId]) -> StoreResult<Vec<VersionRow>>;

    /// Execute a caller-supplied read statement whose rows have the shape
    /// `(sequence, id, data_type, payload, timestamp)`. Arguments bind
    /// positionally as values.
    fn query_versions(&self, sql: &str, args: &[Value]) -> StoreResult<Vec<VersionRow>>;

    // ---------------------------------------------------------------
    // Current-existence index
    // ---------------------------------------------------------------

    /// Insert an index row for `id` unless one exists. Returns `true` if a row
    /// was inserted.
    fn upsert_index(&self, id: &RecordId, data_type: &DataType) -> StoreResult<bool>;

    /// Remove the index row for `id`. Returns `true` if a row existed.
    fn remove_index(&self, id: &RecordId) -> StoreResult<bool>;

    /// The index row of `id` if it is indexed under `data_type`.
    fn index_entry(&self, id: &RecordId, data_type: &DataType) -> StoreResult<Option<IndexRow>>;

    /// Number of index rows for `data_type`.
    fn index_count(&self, data_type: &DataType) -> StoreResult<u64>;

    /// Highest index sequence for `data_type`, `None` if it has no rows.
    fn index_max_sequence(&self, data_type: &DataType) -> StoreResult<Option<u64>>;

    /// Counts of index rows below and above `anchor` for `data_type`.
    fn index_window(&self, data_type: &DataType, anchor: u64) -> StoreResult<IndexWindow>;

    /// Up to `limit` ids indexed under `data_type` with a sequence below
    /// `anchor`, highest sequence first.
    fn index_ids_before(
        &self,
        data_type: &DataType,
        anchor: u64,
        limit: usize,
    ) -> StoreResult<Vec<RecordId>>;

    // ---------------------------------------------------------------
    // Reconciliation
    // ---------------------------------------------------------------

    /// Ids whose latest version is live but which have no index row, with the
    /// data type of that latest version.
    fn unindexed_live(&self) -> StoreResult<Vec<(RecordId, DataType)>>;

    /// Index rows whose id has no versions or whose latest version is a
    /// tombstone.
    fn stale_index_rows(&self) -> StoreResult<Vec<IndexRow>>;

    /// Index `id` under `data_type` only if its latest version, checked in
    /// the same statement, is live and stored under `data_type`. Returns
    /// `true` if a row was inserted.
    fn index_if_live(&self, id: &RecordId, data_type: &DataType) -> StoreResult<bool>;

    /// Remove the index row of `id` only if, in the same statement, it has no
    /// versions or its latest version is a tombstone. Returns `true` if a row
    /// was removed.
    fn unindex_if_dead(&self, id: &RecordId) -> StoreResult<bool>;

    /// Aggregate sizes of both relations.
    fn stats(&self) -> StoreResult<StoreStats>;
}
