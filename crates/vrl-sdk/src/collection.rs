use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vrl_ledger::{Ledger, Record};
use vrl_types::{Apply, DataType, Identify, RecordId, Timestamp};

use crate::cursor::Cursor;
use crate::error::{SdkError, SdkResult};

/// A domain value stored in a [`Collection`].
pub trait Entity: Identify + Apply + Serialize + DeserializeOwned {
    /// Tag for collections of this type when it is fixed at compile time.
    const DATA_TYPE: Option<&'static str> = None;

    /// Receives the tag the decoded record was stored under.
    fn set_data_type(&mut self, _data_type: &DataType) {}
}

/// Page metadata in connection form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub start_cursor: Option<Cursor>,
    pub end_cursor: Option<Cursor>,
    /// Newer entities exist before this page.
    pub has_next_page: bool,
    /// Older entities exist after this page.
    pub has_previous_page: bool,
    /// Current entities in the whole collection.
    pub total: u64,
}

impl From<&vrl_ledger::PageInfo> for PageInfo {
    fn from(page: &vrl_ledger::PageInfo) -> Self {
        Self {
            start_cursor: page.start_id.map(Cursor::new),
            end_cursor: page.end_id.map(Cursor::new),
            has_next_page: page.has_next,
            has_previous_page: page.has_previous,
            total: page.total,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge<T> {
    pub cursor: Cursor,
    pub node: T,
}

/// One page of a collection, newest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }

    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// One entry of an entity's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Version<T> {
    pub sequence: u64,
    pub timestamp: Timestamp,
    /// `None` for a deletion.
    pub value: Option<T>,
}

impl<T> Version<T> {
    pub fn is_deleted(&self) -> bool {
        self.value.is_none()
    }
}

/// Typed view of the ledger restricted to one data type.
pub struct Collection<T> {
    ledger: Ledger,
    data_type: DataType,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            data_type: self.data_type.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

impl<T: Entity> Collection<T> {
    /// A collection under `T::DATA_TYPE`.
    pub fn new(ledger: Ledger) -> SdkResult<Self> {
        let tag = T::DATA_TYPE.ok_or_else(|| {
            SdkError::InvalidOperation(
                "entity has no fixed data type; use Collection::with_data_type".into(),
            )
        })?;
        Ok(Self::with_data_type(ledger, DataType::new(tag)?))
    }

    pub fn with_data_type(ledger: Ledger, data_type: DataType) -> Self {
        Self {
            ledger,
            data_type,
            _marker: PhantomData,
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Up to `first` current entities, newest first, starting after `before`.
    pub fn fetch(&self, first: usize, before: Option<&Cursor>) -> SdkResult<Connection<T>> {
        let before_id = before.map(Cursor::id);
        let mut results = self.ledger.fetch(&self.data_type, first, before_id.as_ref())?;
        let page_info = PageInfo::from(results.page());

        let mut edges = Vec::with_capacity(results.len());
        while let Some(record) = results.next_record() {
            let node = self.decode(&record)?;
            edges.push(Edge {
                cursor: Cursor::new(record.id),
                node,
            });
        }
        debug!(data_type = %self.data_type, edges = edges.len(), "fetched connection");
        Ok(Connection { edges, page_info })
    }

    /// The current value of `id`. Deleted entities are not found.
    pub fn read(&self, id: &RecordId) -> SdkResult<T> {
        let record = self.ledger.read(id, &self.data_type)?;
        if record.is_tombstone() {
            return Err(SdkError::NotFound(format!(
                "{} {id} was deleted",
                self.data_type
            )));
        }
        self.decode(&record)
    }

    /// Persist a new version of `value` and return it as stored.
    pub fn write(&self, value: &T) -> SdkResult<T> {
        let data_type = value.identify_type();
        if data_type != self.data_type {
            return Err(SdkError::InvalidOperation(format!(
                "cannot write {data_type} into a {} collection",
                self.data_type
            )));
        }
        let record = self.ledger.write(value)?;
        self.decode(&record)
    }

    pub fn delete(&self, id: &RecordId) -> SdkResult<()> {
        self.ledger.delete(id, &self.data_type)?;
        Ok(())
    }

    /// Every version of `id` in this collection, newest first.
    pub fn history(&self, id: &RecordId) -> SdkResult<Vec<Version<T>>> {
        self.ledger
            .history(id)?
            .filter(|record| record.data_type == self.data_type)
            .map(|record| self.version(&record))
            .collect()
    }

    /// Re-append the version written at exactly `at`.
    pub fn restore(&self, id: &RecordId, at: Timestamp) -> SdkResult<Version<T>> {
        let record = self.ledger.restore(id, &self.data_type, at)?;
        self.version(&record)
    }

    fn version(&self, record: &Record) -> SdkResult<Version<T>> {
        let value = if record.is_tombstone() {
            None
        } else {
            Some(self.decode(record)?)
        };
        Ok(Version {
            sequence: record.sequence,
            timestamp: record.timestamp,
            value,
        })
    }

    fn decode(&self, record: &Record) -> SdkResult<T> {
        let mut value: T = self.ledger.scan(record)?;
        value.set_data_type(&record.data_type);
        Ok(value)
    }
}
