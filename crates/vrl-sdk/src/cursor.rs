//! Opaque page cursors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vrl_types::{RecordId, TypeError};

const PREFIX: &str = "cursor:";

/// Opaque token naming a position in a paged collection.
///
/// Encodes as lowercase hex of `cursor:<record id>`. Callers should treat the
/// token as opaque and only hand it back to `fetch`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor(RecordId);

impl Cursor {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }

    /// The record the cursor points at.
    pub fn id(&self) -> RecordId {
        self.0
    }

    pub fn encode(&self) -> String {
        hex::encode(format!("{PREFIX}{}", self.0))
    }

    pub fn decode(token: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(token.trim())
            .map_err(|e| TypeError::InvalidCursor(format!("{token:?}: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| TypeError::InvalidCursor(format!("{token:?}: not UTF-8")))?;
        let id = text
            .strip_prefix(PREFIX)
            .ok_or_else(|| TypeError::InvalidCursor(format!("{token:?}: missing prefix")))?;
        RecordId::parse(id)
            .map(Self)
            .map_err(|e| TypeError::InvalidCursor(e.to_string()))
    }
}

impl From<RecordId> for Cursor {
    fn from(id: RecordId) -> Self {
        Self(id)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.encode()
    }
}

impl TryFrom<String> for Cursor {
    type Error = TypeError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        Self::decode(&token)
    }
}

impl FromStr for Cursor {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.0)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
