use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use vrl_store::RelationStore;
use vrl_types::{Apply, RecordId};

use crate::error::{LedgerError, LedgerResult};
use crate::record::{self, Record};

/// Page metadata carried by every [`ResultSet`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Rows in the whole collection the page was cut from.
    pub total: u64,
    /// Newer rows exist beyond the start of this page.
    pub has_next: bool,
    /// Older rows exist beyond the end of this page.
    pub has_previous: bool,
    pub start_id: Option<RecordId>,
    pub end_id: Option<RecordId>,
}

impl PageInfo {
    /// Metadata for an unpaginated result: total is the row count and the
    /// bounds are the first and last rows.
    pub fn unpaginated(records: &[Record]) -> Self {
        Self {
            total: records.len() as u64,
            has_next: false,
            has_previous: false,
            start_id: records.first().map(|r| r.id),
            end_id: records.last().map(|r| r.id),
        }
    }
}

/// An eagerly materialized, single-pass sequence of records.
///
/// Drain it with [`ResultSet::scan_next`] into typed values or iterate the
/// raw [`Record`]s. The first decode failure is kept: after it, the set yields
/// nothing more and the error is available from [`ResultSet::err`] or
/// [`ResultSet::finish`].
pub struct ResultSet {
    records: VecDeque<Record>,
    store: Arc<dyn RelationStore>,
    page: PageInfo,
    err: Option<LedgerError>,
}

impl ResultSet {
    pub(crate) fn new(records: Vec<Record>, store: Arc<dyn RelationStore>, page: PageInfo) -> Self {
        Self {
            records: records.into(),
            store,
            page,
            err: None,
        }
    }

    pub(crate) fn unpaginated(records: Vec<Record>, store: Arc<dyn RelationStore>) -> Self {
        let page = PageInfo::unpaginated(&records);
        Self::new(records, store, page)
    }

    pub fn page(&self) -> &PageInfo {
        &self.page
    }

    /// Records still to be yielded; zero once an error has stopped the set.
    pub fn len(&self) -> usize {
        if self.err.is_some() {
            0
        } else {
            self.records.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The next raw record, or `None` once drained or after an error.
    pub fn next_record(&mut self) -> Option<Record> {
        if self.err.is_some() {
            return None;
        }
        self.records.pop_front()
    }

    /// Decode the next record into `T`.
    ///
    /// Returns `None` when the set is drained or a previous step failed.
    pub fn scan_next<T: DeserializeOwned + Apply>(&mut self) -> Option<T> {
        let record = self.next_record()?;
        match record::decode(self.store.as_ref(), &record) {
            Ok(value) => Some(value),
            Err(e) => {
                self.err = Some(e);
                None
            }
        }
    }

    /// The first error encountered while draining.
    pub fn err(&self) -> Option<&LedgerError> {
        self.err.as_ref()
    }

    /// Consume the set, reporting the first error encountered, if any.
    pub fn finish(self) -> LedgerResult<()> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Decode every remaining record.
    pub fn scan_all<T: DeserializeOwned + Apply>(mut self) -> LedgerResult<Vec<T>> {
        let mut values = Vec::with_capacity(self.len());
        while let Some(value) = self.scan_next() {
            values.push(value);
        }
        self.finish().map(|()| values)
    }

    /// The remaining raw records.
    pub fn into_records(self) -> Vec<Record> {
        self.records.into()
    }
}

impl Iterator for ResultSet {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.next_record()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len();
        (n, Some(n))
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("remaining", &self.records.len())
            .field("page", &self.page)
            .field("err", &self.err)
            .finish()
    }
}
