//! Schemaless entities.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vrl_types::{DataType, HasNode, Identify, Node, RecordId};

use crate::collection::Entity;
use crate::error::{SdkError, SdkResult};

/// Tag a document gets when decoded before its collection assigns one.
pub const DEFAULT_DOCUMENT_TYPE: &str = "document";

/// A JSON object stored under a data type chosen at runtime.
///
/// Only the body is persisted; the id and timing live in the embedded
/// [`Node`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    node: Node,
    data_type: DataType,
    body: Map<String, Value>,
}

impl Document {
    pub fn new(data_type: DataType, body: Map<String, Value>) -> Self {
        Self {
            node: Node::default(),
            data_type,
            body,
        }
    }

    /// Build from any JSON value; only objects are accepted.
    pub fn from_value(data_type: DataType, value: Value) -> SdkResult<Self> {
        match value {
            Value::Object(body) => Ok(Self::new(data_type, body)),
            other => Err(SdkError::InvalidOperation(format!(
                "document body must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Target an existing entity, so a write becomes a new version of it.
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.node.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<RecordId> {
        self.node.id
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn meta(&self) -> &Node {
        &self.node
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }

    /// The body together with its metadata, for display.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "id": self.node.id,
            "data_type": self.data_type,
            "sequence": self.node.sequence,
            "created": self.node.created.to_rfc3339(),
            "modified": self.node.modified.to_rfc3339(),
            "body": self.body,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl HasNode for Document {
    fn node(&self) -> &Node {
        &self.node
    }

    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

impl Identify for Document {
    fn identify_id(&self) -> Option<RecordId> {
        self.node.id
    }

    fn identify_type(&self) -> DataType {
        self.data_type.clone()
    }
}

impl Entity for Document {
    fn set_data_type(&mut self, data_type: &DataType) {
        self.data_type = data_type.clone();
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let body = Map::deserialize(deserializer)?;
        let data_type = DataType::new(DEFAULT_DOCUMENT_TYPE).map_err(<D::Error as de::Error>::custom)?;
        Ok(Self::new(data_type, body))
    }
}
