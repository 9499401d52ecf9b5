//! Helpers for SQL log lines.

use crate::value::Value;

/// `tracing` target for every event this crate emits.
pub const SQL_TARGET: &str = "dbbind.sql";

/// Longest SQL (in bytes) written to a log line before truncation.
pub const MAX_LOGGED_SQL: usize = 200;

/// Records shown in the first-chunk preview.
pub(crate) const PREVIEW_RECORDS: usize = 2;

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

pub(crate) fn truncate_sql(sql: &str) -> String {
    if sql.len() > MAX_LOGGED_SQL {
        format!("{}...", truncate_sql_bytes(sql, MAX_LOGGED_SQL))
    } else {
        sql.to_string()
    }
}

/// Debug rendering of the first few rows of a chunk.
pub(crate) fn preview(rows: &[Vec<Value>]) -> String {
    let shown = &rows[..rows.len().min(PREVIEW_RECORDS)];
    if rows.len() > shown.len() {
        format!("{shown:?} (+{} more)", rows.len() - shown.len())
    } else {
        format!("{shown:?}")
    }
}
