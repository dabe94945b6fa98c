//! Shape validation for caller-supplied read statements.
//!
//! Validation is textual: the statement is never parsed. It catches the
//! common mistakes (wrong projection, wrong relation, a write statement)
//! before anything reaches the store. Callers remain responsible for what
//! the statement does beyond that.

/// The projection every ad hoc statement must return, in this order.
pub const PROJECTION: &str = "sequence, id, data_type, payload, timestamp";

/// Relation holding the full version history.
pub const HISTORY_RELATION: &str = "record";

/// Why a statement was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryShapeViolation {
    #[error("statement is empty")]
    Empty,

    #[error("statement must begin with SELECT or WITH")]
    NotARead,

    #[error("statement must project `{PROJECTION}` in that order")]
    Projection,

    #[error("statement must read FROM `{HISTORY_RELATION}`")]
    Relation,
}

/// Check that `sql` is a read statement with the record projection over the
/// history relation.
pub fn validate(sql: &str) -> Result<(), QueryShapeViolation> {
    let normalized = normalize(sql);
    if normalized.is_empty() {
        return Err(QueryShapeViolation::Empty);
    }
    if !starts_with_keyword(&normalized, "select") && !starts_with_keyword(&normalized, "with") {
        return Err(QueryShapeViolation::NotARead);
    }
    if !normalized.contains(&normalize(PROJECTION)) {
        return Err(QueryShapeViolation::Projection);
    }
    if !reads_history(&normalized) {
        return Err(QueryShapeViolation::Relation);
    }
    Ok(())
}

/// Lowercase, collapse whitespace runs to one space, and drop spaces around
/// commas.
fn normalize(sql: &str) -> String {
    let collapsed = sql
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    collapsed.replace(" ,", ",").replace(", ", ",")
}

fn starts_with_keyword(normalized: &str, keyword: &str) -> bool {
    normalized
        .strip_prefix(keyword)
        .is_some_and(|rest| rest.is_empty() || !is_ident_char(rest.chars().next()))
}

fn reads_history(normalized: &str) -> bool {
    let needle = format!("from {HISTORY_RELATION}");
    normalized
        .match_indices(&needle)
        .any(|(at, _)| !is_ident_char(normalized[at + needle.len()..].chars().next()))
}

fn is_ident_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}
