use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Wall-clock insertion time of a record version.
///
/// Stored as microseconds since the UNIX epoch, which is the precision the
/// backing store persists. Converting to and from [`DateTime<Utc>`] is
/// lossless for any value the store hands out, so a timestamp read from a
/// record can be passed back to `restore` and match exactly.
///
/// Ordering is plain numeric ordering of the microsecond count.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp {
    micros: i64,
}

impl Timestamp {
    /// Create a timestamp from microseconds since the UNIX epoch.
    pub const fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// The zero timestamp (UNIX epoch).
    pub const fn zero() -> Self {
        Self { micros: 0 }
    }

    /// Truncates sub-microsecond precision.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            micros: dt.timestamp_micros(),
        }
    }

    pub fn as_micros(&self) -> i64 {
        self.micros
    }

    pub fn is_zero(&self) -> bool {
        self.micros == 0
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_micros(self.micros).unwrap_or_default()
    }

    /// RFC 3339 with microsecond precision, e.g. `2024-05-01T12:00:00.000001Z`.
    pub fn to_rfc3339(&self) -> String {
        self.to_datetime()
            .to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parse either an RFC 3339 string or a bare microsecond count.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if let Ok(micros) = s.parse::<i64>() {
            return Ok(Self::from_micros(micros));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s:?}: {e}")))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.to_datetime()
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}us)", self.micros)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}
