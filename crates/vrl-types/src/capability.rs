//! Capabilities a domain value exposes to the ledger.
//!
//! The ledger never reflects on field names. A value written through it
//! reports its identity with [`Identify`], and a value decoded from it
//! receives identity, timing, and cursor metadata through [`Apply`]. Domain
//! types usually embed a [`Node`] and implement [`HasNode`], which provides
//! [`Apply`] for free.

use serde::{Deserialize, Serialize};

use crate::identity::{DataType, RecordId};
use crate::temporal::Timestamp;

/// Reports the identity of a value about to be written.
pub trait Identify {
    /// The value's id, or `None` when the ledger should assign one.
    fn identify_id(&self) -> Option<RecordId>;

    /// The data type tag the value is stored under.
    fn identify_type(&self) -> DataType;
}

/// Receives ledger metadata after a payload has been decoded.
pub trait Apply {
    fn set_id(&mut self, id: RecordId);

    /// `created` is the timestamp of the earliest version sharing this id;
    /// `modified` is the timestamp of the decoded version.
    fn set_times(&mut self, created: Timestamp, modified: Timestamp);

    /// The decoded version's sequence number (its pagination cursor).
    fn set_sequence(&mut self, sequence: u64);
}

/// Ledger metadata carried alongside a domain value.
///
/// Embed with `#[serde(skip)]` so the metadata never lands in the payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: Option<RecordId>,
    pub sequence: u64,
    pub created: Timestamp,
    pub modified: Timestamp,
}

impl Node {
    /// A node for a value that already has an identity.
    pub fn with_id(id: RecordId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

/// Access to an embedded [`Node`].
pub trait HasNode {
    fn node(&self) -> &Node;
    fn node_mut(&mut self) -> &mut Node;
}

impl HasNode for Node {
    fn node(&self) -> &Node {
        self
    }

    fn node_mut(&mut self) -> &mut Node {
        self
    }
}

impl<T: HasNode> Apply for T {
    fn set_id(&mut self, id: RecordId) {
        self.node_mut().id = Some(id);
    }

    fn set_times(&mut self, created: Timestamp, modified: Timestamp) {
        let node = self.node_mut();
        node.created = created;
        node.modified = modified;
    }

    fn set_sequence(&mut self, sequence: u64) {
        self.node_mut().sequence = sequence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Serialize, Deserialize)]
    struct Account {
        name: String,
        #[serde(skip)]
        node: Node,
    }

    impl HasNode for Account {
        fn node(&self) -> &Node {
            &self.node
        }

        fn node_mut(&mut self) -> &mut Node {
            &mut self.node
        }
    }

    impl Identify for Account {
        fn identify_id(&self) -> Option<RecordId> {
            self.node.id
        }

        fn identify_type(&self) -> DataType {
            DataType::new("mock.account").unwrap()
        }
    }

    #[test]
    fn apply_through_embedded_node() {
        let mut account = Account::default();
        let id = RecordId::generate();
        account.set_id(id);
        account.set_times(Timestamp::from_micros(1), Timestamp::from_micros(2));
        account.set_sequence(9);

        assert_eq!(account.identify_id(), Some(id));
        assert_eq!(account.node.created, Timestamp::from_micros(1));
        assert_eq!(account.node.modified, Timestamp::from_micros(2));
        assert_eq!(account.node.sequence, 9);
    }

    #[test]
    fn node_metadata_stays_out_of_payload() {
        let mut account = Account {
            name: "Ada".into(),
            node: Node::default(),
        };
        account.set_id(RecordId::generate());
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, r#"{"name":"Ada"}"#);
    }

    #[test]
    fn bare_node_applies_to_itself() {
        let mut node = Node::default();
        node.set_sequence(3);
        assert_eq!(node.sequence, 3);
        assert!(node.id.is_none());
    }
}
