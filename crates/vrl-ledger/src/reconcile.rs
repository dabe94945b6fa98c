//! Index reconciliation.
//!
//! `write`, `delete`, and `restore` append a version and then update the
//! index in a second statement. If the second statement fails, the index
//! drifts from history. The audit here finds that drift and the repair
//! brings the index back to "indexed exactly while the latest version is
//! live".

use serde::{Deserialize, Serialize};
use tracing::info;
use vrl_types::{DataType, RecordId};

use crate::error::LedgerResult;
use crate::ledger::Ledger;

/// One entity named by an index audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: RecordId,
    pub data_type: DataType,
}

/// Outcome of an index audit or repair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Live entities without an index row.
    pub missing: Vec<IndexEntry>,
    /// Index rows whose entity is deleted or has no history.
    pub stale: Vec<IndexEntry>,
}

impl IndexReport {
    /// Returns `true` if the index matches history.
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

impl Ledger {
    /// Report index drift without changing anything.
    pub fn audit_index(&self) -> LedgerResult<IndexReport> {
        let store = self.store();
        let missing = store
            .unindexed_live()?
            .into_iter()
            .map(|(id, data_type)| IndexEntry { id, data_type })
            .collect();
        let stale = store
            .stale_index_rows()?
            .into_iter()
            .map(|row| IndexEntry {
                id: row.id,
                data_type: row.data_type,
            })
            .collect();
        Ok(IndexReport { missing, stale })
    }

    /// Repair index drift. Returns the entries actually changed.
    ///
    /// Each repair re-checks the latest version in the same statement that
    /// changes the index, so a write landing after the audit is never undone.
    pub fn reconcile_index(&self) -> LedgerResult<IndexReport> {
        let audit = self.audit_index()?;
        self.repair_index(audit)
    }

    pub(crate) fn repair_index(&self, audit: IndexReport) -> LedgerResult<IndexReport> {
        let store = self.store();
        let mut repaired = IndexReport::default();

        for entry in audit.missing {
            if store.index_if_live(&entry.id, &entry.data_type)? {
                repaired.missing.push(entry);
            }
        }
        for entry in audit.stale {
            if store.unindex_if_dead(&entry.id)? {
                repaired.stale.push(entry);
            }
        }

        if !repaired.is_consistent() {
            info!(
                indexed = repaired.missing.len(),
                unindexed = repaired.stale.len(),
                "reconciled index"
            );
        }
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrl_types::{Identify, TOMBSTONE};

    #[derive(Serialize)]
    struct Account {
        name: &'static str,
    }

    impl Identify for Account {
        fn identify_id(&self) -> Option<RecordId> {
            None
        }

        fn identify_type(&self) -> DataType {
            account()
        }
    }

    fn account() -> DataType {
        DataType::new("mock.account").unwrap()
    }

    #[test]
    fn ledger_writes_leave_index_consistent() {
        let ledger = Ledger::in_memory().unwrap();
        let written = ledger.write(&Account { name: "Ada" }).unwrap();
        ledger.delete(&written.id, &account()).unwrap();
        ledger.write(&Account { name: "Grace" }).unwrap();

        assert!(ledger.audit_index().unwrap().is_consistent());
    }

    #[test]
    fn repairs_missing_and_stale_rows() {
        let ledger = Ledger::in_memory().unwrap();
        let store = ledger.store();

        // Versions appended without their index step.
        let live = RecordId::generate();
        store.insert_version(&live, &account(), r#"{"name":"Ada"}"#).unwrap();
        let dead = RecordId::generate();
        store.insert_version(&dead, &account(), r#"{"name":"Bob"}"#).unwrap();
        store.upsert_index(&dead, &account()).unwrap();
        store.insert_version(&dead, &account(), TOMBSTONE).unwrap();

        let audit = ledger.audit_index().unwrap();
        assert_eq!(
            audit.missing,
            vec![IndexEntry {
                id: live,
                data_type: account()
            }]
        );
        assert_eq!(audit.stale.len(), 1);
        assert_eq!(audit.stale[0].id, dead);

        let repaired = ledger.reconcile_index().unwrap();
        assert_eq!(repaired, audit);
        assert!(ledger.audit_index().unwrap().is_consistent());

        let page = ledger.fetch(&account(), 10, None).unwrap();
        assert_eq!(page.page().start_id, Some(live));
        assert_eq!(page.page().total, 1);
    }

    #[test]
    fn delete_after_audit_is_not_reindexed() {
        let ledger = Ledger::in_memory().unwrap();
        let store = ledger.store();
        let id = RecordId::generate();
        store.insert_version(&id, &account(), r#"{"name":"Ada"}"#).unwrap();

        let audit = ledger.audit_index().unwrap();
        assert_eq!(audit.missing.len(), 1);
        store.insert_version(&id, &account(), TOMBSTONE).unwrap();
        store.remove_index(&id).unwrap();

        let repaired = ledger.repair_index(audit).unwrap();
        assert!(repaired.is_consistent());
        assert!(store.index_entry(&id, &account()).unwrap().is_none());
        assert!(ledger.audit_index().unwrap().is_consistent());
    }

    #[test]
    fn restore_after_audit_keeps_its_index_row() {
        let ledger = Ledger::in_memory().unwrap();
        let store = ledger.store();
        let first = ledger.write(&Account { name: "Ada" }).unwrap();
        store.insert_version(&first.id, &account(), TOMBSTONE).unwrap();

        let audit = ledger.audit_index().unwrap();
        assert_eq!(audit.stale.len(), 1);
        ledger
            .restore(&first.id, &account(), first.timestamp)
            .unwrap();

        let repaired = ledger.repair_index(audit).unwrap();
        assert!(repaired.is_consistent());
        assert!(store.index_entry(&first.id, &account()).unwrap().is_some());
        assert!(ledger.audit_index().unwrap().is_consistent());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let ledger = Ledger::in_memory().unwrap();
        let id = RecordId::generate();
        ledger
            .store()
            .insert_version(&id, &account(), r#"{"name":"Ada"}"#)
            .unwrap();

        assert_eq!(ledger.reconcile_index().unwrap().missing.len(), 1);
        assert_eq!(ledger.reconcile_index().unwrap(), IndexReport::default());
    }
}
