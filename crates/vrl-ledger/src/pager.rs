//! Reverse-chronological cursor pagination over the current-existence index.

use tracing::debug;
use vrl_types::{DataType, RecordId};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::result::{PageInfo, ResultSet};

impl Ledger {
    /// One page of current entities of `data_type`, newest first.
    ///
    /// Without `before`, the page starts at the newest entity. With `before`,
    /// it starts just past that entity, so chaining `end_id` of one page
    /// into `before` of the next walks every entity exactly once.
    ///
    /// `has_next` reports newer entities past the start of the page and
    /// `has_previous` older entities past its end. Both are derived from
    /// index counts, never from the length of the page.
    pub fn fetch(
        &self,
        data_type: &DataType,
        first: usize,
        before: Option<&RecordId>,
    ) -> LedgerResult<ResultSet> {
        if first == 0 {
            return Err(LedgerError::InvalidArgument(
                "page size must be positive".into(),
            ));
        }
        let store = self.store();

        let total = store.index_count(data_type)?;
        let Some(latest) = store.index_max_sequence(data_type)? else {
            let page = PageInfo {
                total,
                ..PageInfo::default()
            };
            return Ok(ResultSet::new(vec![], store.clone(), page));
        };

        let anchor = match before {
            Some(id) => Some(
                store
                    .index_entry(id, data_type)?
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!("no current {data_type} {id} to page from"))
                    })?
                    .sequence,
            ),
            None => None,
        };
        let window = store.index_window(data_type, anchor.unwrap_or(latest + 1))?;
        let ids = store.index_ids_before(data_type, anchor.unwrap_or(latest + 1), first)?;
        let selected = ids.len() as u64;

        let (has_next, has_previous) = match anchor {
            Some(_) => (window.after > 0, window.before > selected),
            None => (false, total > selected),
        };
        let page = PageInfo {
            total,
            has_next,
            has_previous,
            start_id: ids.first().copied(),
            end_id: ids.last().copied(),
        };
        debug!(
            %data_type,
            first,
            anchor = ?anchor,
            selected,
            total,
            "fetched page"
        );

        let mut records = self.latest_in_order(&ids)?;
        records.retain(|r| r.data_type == *data_type);
        Ok(ResultSet::new(records, store.clone(), page))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};
    use vrl_types::{HasNode, Identify, Node};

    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Post {
        n: usize,
        #[serde(skip)]
        node: Node,
    }

    impl HasNode for Post {
        fn node(&self) -> &Node {
            &self.node
        }

        fn node_mut(&mut self) -> &mut Node {
            &mut self.node
        }
    }

    impl Identify for Post {
        fn identify_id(&self) -> Option<RecordId> {
            self.node.id
        }

        fn identify_type(&self) -> DataType {
            post_type()
        }
    }

    fn post_type() -> DataType {
        DataType::new("mock.post").unwrap()
    }

    /// Write `n` posts; ids are returned oldest first.
    fn seed(ledger: &Ledger, n: usize) -> Vec<RecordId> {
        (0..n)
            .map(|i| {
                ledger
                    .write(&Post {
                        n: i,
                        node: Node::default(),
                    })
                    .unwrap()
                    .id
            })
            .collect()
    }

    #[test]
    fn first_page_then_remaining() {
        let ledger = Ledger::in_memory().unwrap();
        let ids = seed(&ledger, 5);

        let page1 = ledger.fetch(&post_type(), 2, None).unwrap();
        let info1 = page1.page().clone();
        let posts: Vec<Post> = page1.scan_all().unwrap();
        assert_eq!(posts.iter().map(|p| p.n).collect::<Vec<_>>(), vec![4, 3]);
        assert_eq!(info1.total, 5);
        assert!(info1.has_previous);
        assert!(!info1.has_next);
        assert_eq!(info1.start_id, Some(ids[4]));
        assert_eq!(info1.end_id, Some(ids[3]));

        let page2 = ledger
            .fetch(&post_type(), 4, info1.end_id.as_ref())
            .unwrap();
        let info2 = page2.page().clone();
        let posts: Vec<Post> = page2.scan_all().unwrap();
        assert_eq!(posts.iter().map(|p| p.n).collect::<Vec<_>>(), vec![2, 1, 0]);
        assert!(info2.has_next);
        assert!(!info2.has_previous);
    }

    #[test]
    fn empty_collection_is_empty_page() {
        let ledger = Ledger::in_memory().unwrap();
        let page = ledger.fetch(&post_type(), 10, None).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.page(), &PageInfo::default());
    }

    #[test]
    fn zero_page_size_is_invalid() {
        let ledger = Ledger::in_memory().unwrap();
        seed(&ledger, 1);
        let err = ledger.fetch(&post_type(), 0, None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_anchor_is_not_found() {
        let ledger = Ledger::in_memory().unwrap();
        seed(&ledger, 2);
        let err = ledger
            .fetch(&post_type(), 2, Some(&RecordId::generate()))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn deleted_entities_leave_pages() {
        let ledger = Ledger::in_memory().unwrap();
        let ids = seed(&ledger, 4);
        ledger.delete(&ids[2], &post_type()).unwrap();

        let page = ledger.fetch(&post_type(), 10, None).unwrap();
        assert_eq!(page.page().total, 3);
        let seen: Vec<RecordId> = page.map(|r| r.id).collect();
        assert_eq!(seen, vec![ids[3], ids[1], ids[0]]);

        let err = ledger
            .fetch(&post_type(), 1, Some(&ids[2]))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn updates_keep_creation_order_and_show_latest() {
        let ledger = Ledger::in_memory().unwrap();
        let ids = seed(&ledger, 3);
        ledger
            .write(&Post {
                n: 99,
                node: Node::with_id(ids[0]),
            })
            .unwrap();

        let posts: Vec<Post> = ledger
            .fetch(&post_type(), 3, None)
            .unwrap()
            .scan_all()
            .unwrap();
        assert_eq!(posts.iter().map(|p| p.n).collect::<Vec<_>>(), vec![2, 1, 99]);
    }

    #[test]
    fn short_last_page_flags_come_from_counts() {
        let ledger = Ledger::in_memory().unwrap();
        seed(&ledger, 3);
        let page = ledger.fetch(&post_type(), 3, None).unwrap();
        assert_eq!(page.len(), 3);
        assert!(!page.page().has_previous);
        assert!(!page.page().has_next);
    }

    #[test]
    fn pages_are_scoped_to_data_type() {
        let ledger = Ledger::in_memory().unwrap();
        seed(&ledger, 2);
        let other = DataType::new("mock.other").unwrap();
        let page = ledger.fetch(&other, 5, None).unwrap();
        assert!(page.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn chained_pages_visit_each_entity_once(n in 1usize..30, k in 1usize..8) {
            let ledger = Ledger::in_memory().unwrap();
            let ids = seed(&ledger, n);

            let mut seen = Vec::new();
            let mut before: Option<RecordId> = None;
            loop {
                let page = ledger.fetch(&post_type(), k, before.as_ref()).unwrap();
                let info = page.page().clone();
                prop_assert_eq!(info.total, n as u64);
                // The anchor itself counts on neither side.
                let newer_than_anchor = seen.len().saturating_sub(1);
                prop_assert_eq!(info.has_next, before.is_some() && newer_than_anchor > 0);
                seen.extend(page.map(|r| r.id));
                if !info.has_previous {
                    break;
                }
                before = info.end_id;
            }

            let unique: HashSet<_> = seen.iter().collect();
            prop_assert_eq!(unique.len(), seen.len());
            let mut expected = ids;
            expected.reverse();
            prop_assert_eq!(seen, expected);
        }
    }
}
