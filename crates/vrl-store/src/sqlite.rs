//! SQLite-backed relation store.
//!
//! One connection guarded by a mutex; each trait method holds the lock for
//! exactly one statement. On-disk databases run in WAL mode unless disabled.

// SQLite returns i64 for sequences and counts, but they're always non-negative.
#![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::Value;
use tracing::{debug, info};
use vrl_types::{DataType, RecordId, Timestamp, TOMBSTONE};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::row::{IndexRow, IndexWindow, StoreStats, VersionRow};
use crate::traits::RelationStore;

/// Schema SQL embedded at compile time.
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

const VERSION_COLUMNS: &str = "sequence, id, data_type, payload, timestamp";

/// Subquery selecting the sequence of the latest version of `r.id`.
const LATEST_OF_R: &str = "(SELECT l.sequence FROM record l WHERE l.id = r.id \
     ORDER BY l.timestamp DESC, l.sequence DESC LIMIT 1)";

/// [`RelationStore`] over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteStore {
    /// Open or create an on-disk store at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(&StoreConfig::at(path.as_ref()))
    }

    /// Open a store as described by `config`.
    pub fn open_with(config: &StoreConfig) -> StoreResult<Self> {
        let conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        if config.wal && config.path.is_some() {
            let mode: String =
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            debug!(journal_mode = %mode, "configured journal mode");
        }
        conn.execute_batch(SCHEMA_SQL)?;

        info!(
            path = ?config.path,
            wal = config.wal,
            "opened relation store"
        );
        Ok(Self {
            conn: Mutex::new(conn),
            path: config.path.clone(),
        })
    }

    /// A private in-memory store, for tests and embedding.
    pub fn in_memory() -> StoreResult<Self> {
        Self::open_with(&StoreConfig::default())
    }

    /// The database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    /// Append a version using `now` as the clock reading.
    ///
    /// The stored timestamp is `max(now, latest timestamp of id + 1)`, computed
    /// inside the insert so it stays strictly increasing per id.
    fn insert_version_at(
        &self,
        id: &RecordId,
        data_type: &DataType,
        payload: &str,
        now: Timestamp,
    ) -> StoreResult<VersionRow> {
        let conn = self.lock()?;
        let (sequence, timestamp): (i64, i64) = conn.query_row(
            "INSERT INTO record (id, data_type, payload, timestamp)
             VALUES (?1, ?2, ?3, MAX(?4, COALESCE(
                 (SELECT MAX(timestamp) + 1 FROM record WHERE id = ?1), ?4)))
             RETURNING sequence, timestamp",
            params![id.to_string(), data_type.as_str(), payload, now.as_micros()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        debug!(%id, %data_type, sequence, "inserted version");

        Ok(VersionRow {
            sequence: sequence as u64,
            id: *id,
            data_type: data_type.clone(),
            payload: payload.to_string(),
            timestamp: Timestamp::from_micros(timestamp),
        })
    }
}

type RawVersion = (i64, String, String, String, i64);

fn raw_version(row: &Row<'_>) -> rusqlite::Result<RawVersion> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_version(raw: RawVersion) -> StoreResult<VersionRow> {
    let (sequence, id, data_type, payload, timestamp) = raw;
    Ok(VersionRow {
        sequence: sequence as u64,
        id: parse_id(sequence, &id)?,
        data_type: parse_data_type(sequence, data_type)?,
        payload,
        timestamp: Timestamp::from_micros(timestamp),
    })
}

fn into_versions(raw: Vec<RawVersion>) -> StoreResult<Vec<VersionRow>> {
    raw.into_iter().map(into_version).collect()
}

fn into_index_row((sequence, id, data_type): (i64, String, String)) -> StoreResult<IndexRow> {
    Ok(IndexRow {
        sequence: sequence as u64,
        id: parse_id(sequence, &id)?,
        data_type: parse_data_type(sequence, data_type)?,
    })
}

fn parse_id(sequence: i64, id: &str) -> StoreResult<RecordId> {
    RecordId::parse(id).map_err(|e| StoreError::CorruptRow {
        sequence,
        reason: e.to_string(),
    })
}

fn parse_data_type(sequence: i64, data_type: String) -> StoreResult<DataType> {
    DataType::new(data_type).map_err(|e| StoreError::CorruptRow {
        sequence,
        reason: e.to_string(),
    })
}

fn sql_value(value: &Value) -> StoreResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match (n.as_i64(), n.is_f64()) {
            (Some(i), _) => SqlValue::Integer(i),
            (None, true) => SqlValue::Real(n.as_f64().unwrap_or_default()),
            (None, false) => {
                return Err(StoreError::InvalidArgument(format!(
                    "integer {n} does not fit a 64-bit signed column"
                )))
            }
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    })
}

impl RelationStore for SqliteStore {
    fn insert_version(
        &self,
        id: &RecordId,
        data_type: &DataType,
        payload: &str,
    ) -> StoreResult<VersionRow> {
        self.insert_version_at(id, data_type, payload, Timestamp::now())
    }

    fn latest_version(
        &self,
        id: &RecordId,
        data_type: &DataType,
    ) -> StoreResult<Option<VersionRow>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM record
                     WHERE id = ?1 AND data_type = ?2
                     ORDER BY timestamp DESC, sequence DESC LIMIT 1"
                ),
                params![id.to_string(), data_type.as_str()],
                raw_version,
            )
            .optional()?;
        raw.map(into_version).transpose()
    }

    fn version_at(
        &self,
        id: &RecordId,
        data_type: &DataType,
        at: Timestamp,
    ) -> StoreResult<Option<VersionRow>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM record
                     WHERE id = ?1 AND data_type = ?2 AND timestamp = ?3
                     ORDER BY sequence DESC LIMIT 1"
                ),
                params![id.to_string(), data_type.as_str(), at.as_micros()],
                raw_version,
            )
            .optional()?;
        raw.map(into_version).transpose()
    }

    fn versions(&self, id: &RecordId) -> StoreResult<Vec<VersionRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM record
             WHERE id = ?1
             ORDER BY timestamp DESC, sequence DESC"
        ))?;
        let raw = stmt
            .query_map(params![id.to_string()], raw_version)?
            .collect::<Result<Vec<_>, _>>()?;
        into_versions(raw)
    }

    fn earliest_timestamp(&self, id: &RecordId) -> StoreResult<Option<Timestamp>> {
        let conn = self.lock()?;
        let micros: Option<i64> = conn.query_row(
            "SELECT MIN(timestamp) FROM record WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(micros.map(Timestamp::from_micros))
    }

    fn data_type_of(&self, id: &RecordId) -> StoreResult<Option<DataType>> {
        let conn = self.lock()?;
        let raw: Option<(i64, String)> = conn
            .query_row(
                "SELECT sequence, data_type FROM record WHERE id = ?1
                 ORDER BY sequence LIMIT 1",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        raw.map(|(sequence, data_type)| parse_data_type(sequence, data_type))
            .transpose()
    }

    fn latest_versions_in(&self, ids: &[RecordId]) -> StoreResult<Vec<VersionRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM record r
             WHERE r.id IN ({placeholders})
             AND r.sequence = {LATEST_OF_R}"
        ))?;
        let raw = stmt
            .query_map(params_from_iter(ids.iter().map(ToString::to_string)), raw_version)?
            .collect::<Result<Vec<_>, _>>()?;
        into_versions(raw)
    }

    fn query_versions(&self, sql: &str, args: &[Value]) -> StoreResult<Vec<VersionRow>> {
        let args = args.iter().map(sql_value).collect::<StoreResult<Vec<_>>>()?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let raw = stmt
            .query_map(params_from_iter(args), raw_version)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(rows = raw.len(), "executed ad hoc query");
        into_versions(raw)
    }

    fn upsert_index(&self, id: &RecordId, data_type: &DataType) -> StoreResult<bool> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO record_index (id, data_type) VALUES (?1, ?2)",
            params![id.to_string(), data_type.as_str()],
        )?;
        Ok(inserted > 0)
    }

    fn remove_index(&self, id: &RecordId) -> StoreResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM record_index WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(removed > 0)
    }

    fn index_if_live(&self, id: &RecordId, data_type: &DataType) -> StoreResult<bool> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO record_index (id, data_type)
                 SELECT r.id, r.data_type FROM record r
                 WHERE r.id = ?1 AND r.data_type = ?2
                 AND r.sequence = {LATEST_OF_R}
                 AND r.payload != ?3"
            ),
            params![id.to_string(), data_type.as_str(), TOMBSTONE],
        )?;
        Ok(inserted > 0)
    }

    fn unindex_if_dead(&self, id: &RecordId) -> StoreResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM record_index
             WHERE id = ?1
             AND COALESCE((SELECT r.payload FROM record r WHERE r.id = ?1
                 ORDER BY r.timestamp DESC, r.sequence DESC LIMIT 1), ?2) = ?2",
            params![id.to_string(), TOMBSTONE],
        )?;
        Ok(removed > 0)
    }

    fn index_entry(&self, id: &RecordId, data_type: &DataType) -> StoreResult<Option<IndexRow>> {
        let conn = self.lock()?;
        let raw: Option<(i64, String, String)> = conn
            .query_row(
                "SELECT sequence, id, data_type FROM record_index
                 WHERE id = ?1 AND data_type = ?2",
                params![id.to_string(), data_type.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        raw.map(into_index_row).transpose()
    }

    fn index_count(&self, data_type: &DataType) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM record_index WHERE data_type = ?1",
            params![data_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn index_max_sequence(&self, data_type: &DataType) -> StoreResult<Option<u64>> {
        let conn = self.lock()?;
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(sequence) FROM record_index WHERE data_type = ?1",
            params![data_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(max.map(|m| m as u64))
    }

    fn index_window(&self, data_type: &DataType, anchor: u64) -> StoreResult<IndexWindow> {
        let conn = self.lock()?;
        let (before, after): (i64, i64) = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM record_index
                    WHERE data_type = ?1 AND sequence < ?2),
                (SELECT COUNT(*) FROM record_index
                    WHERE data_type = ?1 AND sequence > ?2)",
            params![data_type.as_str(), anchor as i64],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(IndexWindow {
            before: before as u64,
            after: after as u64,
        })
    }

    fn index_ids_before(
        &self,
        data_type: &DataType,
        anchor: u64,
        limit: usize,
    ) -> StoreResult<Vec<RecordId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT sequence, id FROM record_index
             WHERE sequence < ?1 AND data_type = ?2
             ORDER BY sequence DESC
             LIMIT ?3",
        )?;
        let raw = stmt
            .query_map(
                params![anchor as i64, data_type.as_str(), limit as i64],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter()
            .map(|(sequence, id)| parse_id(*sequence, id))
            .collect()
    }

    fn unindexed_live(&self) -> StoreResult<Vec<(RecordId, DataType)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT r.sequence, r.id, r.data_type FROM record r
             WHERE r.sequence = {LATEST_OF_R}
             AND r.payload != ?1
             AND NOT EXISTS (SELECT 1 FROM record_index i WHERE i.id = r.id)
             ORDER BY r.sequence"
        ))?;
        let raw = stmt
            .query_map(params![TOMBSTONE], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<(i64, String, String)>, _>>()?;
        raw.into_iter()
            .map(|(sequence, id, data_type)| {
                Ok((parse_id(sequence, &id)?, parse_data_type(sequence, data_type)?))
            })
            .collect()
    }

    fn stale_index_rows(&self) -> StoreResult<Vec<IndexRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT i.sequence, i.id, i.data_type FROM record_index i
             WHERE NOT EXISTS (SELECT 1 FROM record r WHERE r.id = i.id)
             OR (SELECT r.payload FROM record r WHERE r.id = i.id
                 ORDER BY r.timestamp DESC, r.sequence DESC LIMIT 1) = ?1
             ORDER BY i.sequence",
        )?;
        let raw = stmt
            .query_map(params![TOMBSTONE], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<(i64, String, String)>, _>>()?;
        raw.into_iter().map(into_index_row).collect()
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        let conn = self.lock()?;
        let (version_count, max_sequence, index_count): (i64, Option<i64>, i64) = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM record),
                (SELECT MAX(sequence) FROM record),
                (SELECT COUNT(*) FROM record_index)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(StoreStats {
            version_count: version_count as u64,
            index_count: index_count as u64,
            max_sequence: max_sequence.unwrap_or(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    fn account() -> DataType {
        DataType::new("mock.account").unwrap()
    }

    #[test]
    fn insert_assigns_increasing_sequences() {
        let s = store();
        let a = RecordId::generate();
        let b = RecordId::generate();

        let v1 = s.insert_version(&a, &account(), r#"{"n":1}"#).unwrap();
        let v2 = s.insert_version(&b, &account(), r#"{"n":2}"#).unwrap();
        let v3 = s.insert_version(&a, &account(), r#"{"n":3}"#).unwrap();

        assert!(v1.sequence < v2.sequence);
        assert!(v2.sequence < v3.sequence);
        assert_eq!(v3.id, a);
    }

    #[test]
    fn timestamps_strictly_increase_per_id_under_a_stalled_clock() {
        let s = store();
        let id = RecordId::generate();
        let now = Timestamp::from_micros(1_000);

        let v1 = s.insert_version_at(&id, &account(), "{\"n\":1}", now).unwrap();
        let v2 = s.insert_version_at(&id, &account(), "{\"n\":2}", now).unwrap();
        let v3 = s
            .insert_version_at(&id, &account(), "{\"n\":3}", Timestamp::from_micros(10))
            .unwrap();

        assert_eq!(v1.timestamp, now);
        assert_eq!(v2.timestamp, Timestamp::from_micros(1_001));
        assert_eq!(v3.timestamp, Timestamp::from_micros(1_002));
    }

    #[test]
    fn clock_is_independent_across_ids() {
        let s = store();
        let now = Timestamp::from_micros(500);
        let a = s
            .insert_version_at(&RecordId::generate(), &account(), "{}", now)
            .unwrap();
        let b = s
            .insert_version_at(&RecordId::generate(), &account(), "{}", now)
            .unwrap();
        assert_eq!(a.timestamp, b.timestamp);
    }

    #[test]
    fn latest_version_is_newest() {
        let s = store();
        let id = RecordId::generate();
        s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();
        s.insert_version(&id, &account(), r#"{"v":2}"#).unwrap();

        let latest = s.latest_version(&id, &account()).unwrap().unwrap();
        assert_eq!(latest.payload, r#"{"v":2}"#);
    }

    #[test]
    fn latest_version_filters_by_data_type() {
        let s = store();
        let id = RecordId::generate();
        s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();

        let other = DataType::new("mock.post").unwrap();
        assert!(s.latest_version(&id, &other).unwrap().is_none());
    }

    #[test]
    fn versions_are_newest_first() {
        let s = store();
        let id = RecordId::generate();
        for n in 0..3 {
            s.insert_version(&id, &account(), &format!("{{\"v\":{n}}}"))
                .unwrap();
        }
        let all = s.versions(&id).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].payload, r#"{"v":2}"#);
        assert_eq!(all[2].payload, r#"{"v":0}"#);
        assert!(all[0].timestamp > all[1].timestamp);
    }

    #[test]
    fn version_at_requires_exact_timestamp() {
        let s = store();
        let id = RecordId::generate();
        let v = s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();

        let found = s.version_at(&id, &account(), v.timestamp).unwrap();
        assert_eq!(found, Some(v.clone()));

        let off_by_one = Timestamp::from_micros(v.timestamp.as_micros() + 1);
        assert!(s.version_at(&id, &account(), off_by_one).unwrap().is_none());
    }

    #[test]
    fn earliest_timestamp_tracks_first_version() {
        let s = store();
        let id = RecordId::generate();
        assert!(s.earliest_timestamp(&id).unwrap().is_none());

        let first = s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();
        s.insert_version(&id, &account(), r#"{"v":2}"#).unwrap();
        assert_eq!(s.earliest_timestamp(&id).unwrap(), Some(first.timestamp));
    }

    #[test]
    fn latest_versions_in_returns_one_row_per_id() {
        let s = store();
        let a = RecordId::generate();
        let b = RecordId::generate();
        s.insert_version(&a, &account(), r#"{"v":"a1"}"#).unwrap();
        s.insert_version(&a, &account(), r#"{"v":"a2"}"#).unwrap();
        s.insert_version(&b, &account(), r#"{"v":"b1"}"#).unwrap();

        let mut rows = s.latest_versions_in(&[a, b, RecordId::generate()]).unwrap();
        rows.sort_by_key(|r| r.sequence);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].payload, r#"{"v":"a2"}"#);
        assert_eq!(rows[1].payload, r#"{"v":"b1"}"#);

        assert!(s.latest_versions_in(&[]).unwrap().is_empty());
    }

    #[test]
    fn data_type_of_is_the_first_versions_tag() {
        let s = store();
        let id = RecordId::generate();
        assert!(s.data_type_of(&id).unwrap().is_none());

        s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();
        assert_eq!(s.data_type_of(&id).unwrap(), Some(account()));
    }

    #[test]
    fn upsert_index_is_idempotent() {
        let s = store();
        let id = RecordId::generate();
        assert!(s.upsert_index(&id, &account()).unwrap());
        assert!(!s.upsert_index(&id, &account()).unwrap());
        assert_eq!(s.index_count(&account()).unwrap(), 1);
    }

    #[test]
    fn index_sequences_are_not_reused_after_removal() {
        let s = store();
        let a = RecordId::generate();
        let b = RecordId::generate();
        s.upsert_index(&a, &account()).unwrap();
        let first = s.index_entry(&a, &account()).unwrap().unwrap().sequence;
        assert!(s.remove_index(&a).unwrap());
        assert!(!s.remove_index(&a).unwrap());

        s.upsert_index(&b, &account()).unwrap();
        let second = s.index_entry(&b, &account()).unwrap().unwrap().sequence;
        assert!(second > first);
    }

    #[test]
    fn index_window_and_ids_before() {
        let s = store();
        let ids: Vec<_> = (0..5).map(|_| RecordId::generate()).collect();
        for id in &ids {
            s.upsert_index(id, &account()).unwrap();
        }
        let anchor = s.index_entry(&ids[2], &account()).unwrap().unwrap().sequence;

        let window = s.index_window(&account(), anchor).unwrap();
        assert_eq!(window, IndexWindow { before: 2, after: 2 });

        let before = s.index_ids_before(&account(), anchor, 10).unwrap();
        assert_eq!(before, vec![ids[1], ids[0]]);

        let max = s.index_max_sequence(&account()).unwrap().unwrap();
        let newest = s.index_ids_before(&account(), max + 1, 2).unwrap();
        assert_eq!(newest, vec![ids[4], ids[3]]);
    }

    #[test]
    fn index_queries_are_scoped_to_data_type() {
        let s = store();
        let post = DataType::new("mock.post").unwrap();
        s.upsert_index(&RecordId::generate(), &account()).unwrap();
        s.upsert_index(&RecordId::generate(), &post).unwrap();

        assert_eq!(s.index_count(&account()).unwrap(), 1);
        assert_eq!(s.index_count(&post).unwrap(), 1);
        let empty = DataType::new("mock.none").unwrap();
        assert_eq!(s.index_max_sequence(&empty).unwrap(), None);
    }

    #[test]
    fn history_rows_cannot_be_updated_or_deleted() {
        let s = store();
        let id = RecordId::generate();
        s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();

        let conn = s.lock().unwrap();
        assert!(conn.execute("UPDATE record SET payload = '{}'", []).is_err());
        assert!(conn.execute("DELETE FROM record", []).is_err());
    }

    #[test]
    fn query_versions_binds_positional_arguments() {
        let s = store();
        let id = RecordId::generate();
        s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();
        s.insert_version(&RecordId::generate(), &account(), r#"{"v":2}"#)
            .unwrap();

        let rows = s
            .query_versions(
                "SELECT sequence, id, data_type, payload, timestamp FROM record WHERE id = ?1",
                &[Value::String(id.to_string())],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
    }

    #[test]
    fn query_versions_rejects_integers_beyond_i64() {
        let s = store();
        s.insert_version(&RecordId::generate(), &account(), "{}").unwrap();
        let sql = "SELECT sequence, id, data_type, payload, timestamp FROM record WHERE sequence < ?1";

        let err = s
            .query_versions(sql, &[serde_json::json!(u64::MAX)])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));

        assert_eq!(s.query_versions(sql, &[serde_json::json!(1.5)]).unwrap().len(), 1);
        assert_eq!(
            s.query_versions(sql, &[serde_json::json!(i64::MAX)]).unwrap().len(),
            1
        );
    }

    #[test]
    fn query_versions_with_wrong_shape_is_database_error() {
        let s = store();
        s.insert_version(&RecordId::generate(), &account(), "{}").unwrap();
        let err = s
            .query_versions("SELECT id FROM record", &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn reconciliation_queries_find_drift() {
        let s = store();
        let live = RecordId::generate();
        let dead = RecordId::generate();
        let ghost = RecordId::generate();

        s.insert_version(&live, &account(), r#"{"v":1}"#).unwrap();
        s.insert_version(&dead, &account(), r#"{"v":1}"#).unwrap();
        s.insert_version(&dead, &account(), TOMBSTONE).unwrap();
        s.upsert_index(&dead, &account()).unwrap();
        s.upsert_index(&ghost, &account()).unwrap();

        let unindexed = s.unindexed_live().unwrap();
        assert_eq!(unindexed, vec![(live, account())]);

        let stale: Vec<_> = s.stale_index_rows().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(stale, vec![dead, ghost]);
    }

    #[test]
    fn conditional_index_repairs_check_the_latest_version() {
        let s = store();
        let id = RecordId::generate();
        s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();
        s.insert_version(&id, &account(), TOMBSTONE).unwrap();

        // Deleted by the time the repair runs: no index row appears.
        assert!(!s.index_if_live(&id, &account()).unwrap());
        assert!(s.index_entry(&id, &account()).unwrap().is_none());

        // Live again: the row is not removed.
        s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();
        assert!(s.index_if_live(&id, &account()).unwrap());
        assert!(!s.unindex_if_dead(&id).unwrap());
        assert!(s.index_entry(&id, &account()).unwrap().is_some());

        // Wrong tag never indexes.
        let post = DataType::new("mock.post").unwrap();
        assert!(!s.index_if_live(&id, &post).unwrap());

        s.insert_version(&id, &account(), TOMBSTONE).unwrap();
        assert!(s.unindex_if_dead(&id).unwrap());

        let ghost = RecordId::generate();
        s.upsert_index(&ghost, &account()).unwrap();
        assert!(s.unindex_if_dead(&ghost).unwrap());
    }

    #[test]
    fn stats_reflect_both_relations() {
        let s = store();
        assert_eq!(s.stats().unwrap(), StoreStats::default());

        let id = RecordId::generate();
        s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();
        let v = s.insert_version(&id, &account(), r#"{"v":2}"#).unwrap();
        s.upsert_index(&id, &account()).unwrap();

        let stats = s.stats().unwrap();
        assert_eq!(stats.version_count, 2);
        assert_eq!(stats.index_count, 1);
        assert_eq!(stats.max_sequence, v.sequence);
    }

    #[test]
    fn on_disk_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let id = RecordId::generate();

        {
            let s = SqliteStore::open(&path).unwrap();
            s.insert_version(&id, &account(), r#"{"v":1}"#).unwrap();
            assert_eq!(s.path(), Some(path.as_path()));
        }

        let s = SqliteStore::open(&path).unwrap();
        let latest = s.latest_version(&id, &account()).unwrap().unwrap();
        assert_eq!(latest.payload, r#"{"v":1}"#);
    }
}
