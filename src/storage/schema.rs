//! Embedded fallback schema and statement classification.

/// Schema applied when the external schema file cannot be read.
///
/// Compiled from the same `sql/schema.sql` that is loaded at runtime by default.
pub const EMBEDDED_SCHEMA: &str = include_str!("../../sql/schema.sql");

/// A statement is a read when, after leading whitespace, it starts with `SELECT`
pub fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"))
}
