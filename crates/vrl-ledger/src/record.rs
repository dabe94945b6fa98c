use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use vrl_store::{RelationStore, VersionRow};
use vrl_types::{is_tombstone, Apply, DataType, RecordId, Timestamp};

use crate::error::{LedgerError, LedgerResult};

/// One persisted version of an entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-wide insertion order; the pagination cursor.
    pub sequence: u64,
    pub id: RecordId,
    pub data_type: DataType,
    /// Compact JSON of the domain value without its ledger metadata.
    pub payload: String,
    pub timestamp: Timestamp,
}

impl Record {
    /// Whether this version marks the entity as deleted.
    pub fn is_tombstone(&self) -> bool {
        is_tombstone(&self.payload)
    }

    /// Deserialize the payload alone, without applying metadata.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> LedgerResult<T> {
        serde_json::from_str(&self.payload).map_err(|e| {
            LedgerError::Decode(format!(
                "{} {} (sequence {}): {e}",
                self.data_type, self.id, self.sequence
            ))
        })
    }

    /// The payload as a JSON value.
    pub fn payload_value(&self) -> LedgerResult<serde_json::Value> {
        self.decode_payload()
    }

    /// Decode into `T` and apply identity, cursor, and timing metadata.
    ///
    /// `created` is the timestamp of the earliest version of this id.
    pub fn decode_with<T: DeserializeOwned + Apply>(&self, created: Timestamp) -> LedgerResult<T> {
        let mut value: T = self.decode_payload()?;
        value.set_id(self.id);
        value.set_sequence(self.sequence);
        value.set_times(created, self.timestamp);
        Ok(value)
    }
}

impl From<VersionRow> for Record {
    fn from(row: VersionRow) -> Self {
        Self {
            sequence: row.sequence,
            id: row.id,
            data_type: row.data_type,
            payload: row.payload,
            timestamp: row.timestamp,
        }
    }
}

/// Decode `record`, looking up its creation time in `store`.
pub(crate) fn decode<T: DeserializeOwned + Apply>(
    store: &dyn RelationStore,
    record: &Record,
) -> LedgerResult<T> {
    let created = store
        .earliest_timestamp(&record.id)?
        .unwrap_or(record.timestamp);
    record.decode_with(created)
}
