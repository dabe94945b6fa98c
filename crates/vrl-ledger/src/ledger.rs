use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use vrl_store::{RelationStore, SqliteStore, StoreConfig, VersionRow};
use vrl_types::{is_tombstone, Apply, DataType, Identify, RecordId, Timestamp, TOMBSTONE};

use crate::error::{LedgerError, LedgerResult};
use crate::query;
use crate::record::{self, Record};
use crate::result::ResultSet;

/// The versioned record ledger.
///
/// A cheap, cloneable handle over a [`RelationStore`]. Every operation is a
/// short sequence of single-statement store calls; operations that issue
/// more than one statement are not atomic as a whole.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn RelationStore>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}

impl Ledger {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self { store }
    }

    /// Open a SQLite-backed ledger.
    pub fn open(config: &StoreConfig) -> LedgerResult<Self> {
        Ok(Self::new(Arc::new(SqliteStore::open_with(config)?)))
    }

    /// A ledger over a private in-memory store.
    pub fn in_memory() -> LedgerResult<Self> {
        Ok(Self::new(Arc::new(SqliteStore::in_memory()?)))
    }

    pub fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }

    // -----------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------

    /// Append a new version of `value`.
    ///
    /// A value without an id gets a freshly generated one. An id keeps the
    /// data type of its first version; writing it under another one fails
    /// with `InvalidArgument`. The version is appended first and the index brought in line second; if the second
    /// step fails the version stays, and [`Ledger::reconcile_index`] (or a
    /// retried write) repairs the index.
    pub fn write<V>(&self, value: &V) -> LedgerResult<Record>
    where
        V: Identify + Serialize + ?Sized,
    {
        let id = value.identify_id().unwrap_or_else(RecordId::generate);
        let data_type = value.identify_type();
        if let Some(existing) = self.store.data_type_of(&id)? {
            if existing != data_type {
                return Err(LedgerError::InvalidArgument(format!(
                    "{id} is a {existing}, not a {data_type}"
                )));
            }
        }
        let payload =
            serde_json::to_string(value).map_err(|e| LedgerError::Encode(e.to_string()))?;
        self.append(&id, &data_type, &payload)
    }

    /// Append a tombstone for `id` and drop it from the index.
    ///
    /// Fails with `NotFound` if `id` has never been written under
    /// `data_type`.
    pub fn delete(&self, id: &RecordId, data_type: &DataType) -> LedgerResult<Record> {
        if self.store.latest_version(id, data_type)?.is_none() {
            return Err(not_found(id, data_type));
        }
        self.append(id, data_type, TOMBSTONE)
    }

    /// Re-append the payload of the version written at exactly `at`.
    ///
    /// History is never rewound: the restored payload becomes a new version
    /// with its own sequence and timestamp.
    pub fn restore(
        &self,
        id: &RecordId,
        data_type: &DataType,
        at: Timestamp,
    ) -> LedgerResult<Record> {
        let target = self.store.version_at(id, data_type, at)?.ok_or_else(|| {
            LedgerError::NotFound(format!("{data_type} {id} has no version at {at}"))
        })?;
        debug!(%id, %data_type, from_sequence = target.sequence, "restoring version");
        self.append(id, data_type, &target.payload)
    }

    fn append(&self, id: &RecordId, data_type: &DataType, payload: &str) -> LedgerResult<Record> {
        let row = self.store.insert_version(id, data_type, payload)?;
        if let Err(e) = self.sync_index(&row) {
            warn!(
                %id,
                %data_type,
                sequence = row.sequence,
                error = %e,
                "version appended but index update failed"
            );
            return Err(e.into());
        }
        debug!(%id, %data_type, sequence = row.sequence, "appended version");
        Ok(row.into())
    }

    /// An id is indexed exactly while its latest version is live.
    fn sync_index(&self, row: &VersionRow) -> vrl_store::StoreResult<()> {
        if is_tombstone(&row.payload) {
            self.store.remove_index(&row.id)?;
        } else {
            self.store.upsert_index(&row.id, &row.data_type)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// The latest version of `id` under `data_type`, tombstones included.
    pub fn read(&self, id: &RecordId, data_type: &DataType) -> LedgerResult<Record> {
        self.store
            .latest_version(id, data_type)?
            .map(Record::from)
            .ok_or_else(|| not_found(id, data_type))
    }

    /// Every version of `id`, newest first. Empty for an unknown id.
    pub fn history(&self, id: &RecordId) -> LedgerResult<ResultSet> {
        let records = self
            .store
            .versions(id)?
            .into_iter()
            .map(Record::from)
            .collect();
        Ok(ResultSet::unpaginated(records, self.store.clone()))
    }

    /// The latest version of each of `ids`, in the order given.
    ///
    /// Ids without versions are skipped; duplicates collapse to their first
    /// position.
    pub fn fetch_in(&self, ids: &[RecordId]) -> LedgerResult<ResultSet> {
        let records = self.latest_in_order(ids)?;
        Ok(ResultSet::unpaginated(records, self.store.clone()))
    }

    pub(crate) fn latest_in_order(&self, ids: &[RecordId]) -> LedgerResult<Vec<Record>> {
        let mut by_id: HashMap<RecordId, VersionRow> = self
            .store
            .latest_versions_in(ids)?
            .into_iter()
            .map(|row| (row.id, row))
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(Record::from)
            .collect())
    }

    /// Decode `record` into `T`, applying id, sequence, and timing metadata.
    ///
    /// `created` is the timestamp of the earliest version of the record's id.
    pub fn scan<T: DeserializeOwned + Apply>(&self, record: &Record) -> LedgerResult<T> {
        record::decode(self.store.as_ref(), record)
    }

    /// Run a caller-supplied read statement.
    ///
    /// The statement must project `sequence, id, data_type, payload,
    /// timestamp` from the `record` relation; anything else is rejected
    /// before execution. `args` bind positionally (`?1`, `?2`, ...).
    pub fn query(&self, sql: &str, args: &[Value]) -> LedgerResult<ResultSet> {
        query::validate(sql)?;
        let records = self
            .store
            .query_versions(sql, args)?
            .into_iter()
            .map(Record::from)
            .collect();
        Ok(ResultSet::unpaginated(records, self.store.clone()))
    }

    /// The first row of [`Ledger::query`], or `NotFound`.
    pub fn query_one(&self, sql: &str, args: &[Value]) -> LedgerResult<Record> {
        self.query(sql, args)?
            .next_record()
            .ok_or_else(|| LedgerError::NotFound("query returned no rows".into()))
    }
}

fn not_found(id: &RecordId, data_type: &DataType) -> LedgerError {
    LedgerError::NotFound(format!("{data_type} {id}"))
}
