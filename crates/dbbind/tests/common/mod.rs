//! In-memory driver that records every call, fails on demand and keeps rows in a
//! transaction until they are committed.

#![allow(dead_code)]

use dbbind::{DbError, DbResult, Driver, ParamStyle, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Many { sql: String, rows: Vec<Vec<Value>> },
    One { sql: String, params: Vec<Value> },
    Commit,
    Rollback,
}

#[derive(Debug, Default)]
pub struct ScriptedDriver {
    pub style: ParamStyle,
    pub calls: Vec<Call>,
    /// Rows whose first value is one of these ints are rejected by the database.
    pub bad: HashSet<i64>,
    /// Reject every row.
    pub fail_all: bool,
    /// Fail `execute_many` with a non-database error.
    pub interface_error: bool,
    /// Rows whose first value is one of these ints fail with a non-database error.
    pub broken: HashSet<i64>,
    pub rollback_fails: bool,
    /// Commits that succeed before every further commit fails.
    pub commits_before_failure: Option<usize>,
    /// Rows reported per successful row.
    pub rows_per_record: u64,
    /// Rows written in the open transaction.
    pub pending: u64,
    pub committed: u64,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            rows_per_record: 1,
            ..Default::default()
        }
    }

    pub fn with_style(style: ParamStyle) -> Self {
        Self {
            style,
            ..Self::new()
        }
    }

    pub fn failing_on(bad: impl IntoIterator<Item = i64>) -> Self {
        Self {
            bad: bad.into_iter().collect(),
            ..Self::new()
        }
    }

    fn check(&self, row: &[Value]) -> DbResult<u64> {
        if matches!(row.first(), Some(Value::Int(v)) if self.broken.contains(v)) {
            return Err(DbError::driver("cursor already closed"));
        }
        let rejected = self.fail_all
            || matches!(row.first(), Some(Value::Int(v)) if self.bad.contains(v));
        if rejected {
            return Err(DbError::database_with_code(
                "23505",
                format!("duplicate key value: {row:?}"),
            ));
        }
        Ok(self.rows_per_record)
    }

    pub fn many_calls(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Many { rows, .. } => Some(rows.len()),
                _ => None,
            })
            .collect()
    }

    pub fn one_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::One { .. }))
            .count()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    /// Calls in order, with batches shown by size.
    pub fn trace(&self) -> Vec<String> {
        self.calls
            .iter()
            .map(|c| match c {
                Call::Many { rows, .. } => format!("many {}", rows.len()),
                Call::One { .. } => "one".to_string(),
                Call::Commit => "commit".to_string(),
                Call::Rollback => "rollback".to_string(),
            })
            .collect()
    }

    /// Rows that would exist if the open transaction were committed now.
    pub fn rows_kept(&self) -> u64 {
        self.committed + self.pending
    }
}

impl Driver for ScriptedDriver {
    fn param_style(&self) -> ParamStyle {
        self.style
    }

    async fn execute_one(&mut self, sql: &str, params: &[Value]) -> DbResult<u64> {
        self.calls.push(Call::One {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        let count = self.check(params)?;
        self.pending += count;
        Ok(count)
    }

    async fn execute_many(&mut self, sql: &str, rows: &[Vec<Value>]) -> DbResult<u64> {
        self.calls.push(Call::Many {
            sql: sql.to_string(),
            rows: rows.to_vec(),
        });
        if self.interface_error {
            return Err(DbError::driver("cursor already closed"));
        }
        let count = rows.iter().map(|r| self.check(r)).sum::<DbResult<u64>>()?;
        self.pending += count;
        Ok(count)
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.calls.push(Call::Rollback);
        if self.rollback_fails {
            return Err(DbError::Connection("server closed the connection".into()));
        }
        self.pending = 0;
        Ok(())
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.calls.push(Call::Commit);
        let done = self.count(&Call::Commit) - 1;
        if self.commits_before_failure.is_some_and(|n| done >= n) {
            return Err(DbError::database_with_code(
                "40001",
                "could not serialize access due to concurrent update",
            ));
        }
        self.committed += self.pending;
        self.pending = 0;
        Ok(())
    }
}

pub fn int_rows(n: i64) -> Vec<Vec<Value>> {
    (0..n).map(|i| vec![Value::Int(i), Value::Text(format!("name-{i}"))]).collect()
}
