//! The canonical tombstone payload.

/// Payload written by `delete`: an empty JSON object.
pub const TOMBSTONE: &str = "{}";

/// Reports whether a stored payload is the tombstone marker.
///
/// Only the canonical text counts; the ledger always writes compact JSON,
/// so an empty object it produced is exactly `{}`.
pub fn is_tombstone(payload: &str) -> bool {
    payload == TOMBSTONE
}
