//! Single-table write helpers.
//!
//! Each helper generates named-placeholder SQL (`:c0` for inserted columns, `:u0` for
//! assignments, `:w0` for conditions) and runs it through the owning [`Session`], so
//! chunking and failure isolation apply exactly as for hand-written SQL.

use crate::bind::Batch;
use crate::driver::Driver;
use crate::error::{DbError, DbResult};
use crate::executor::rollback_after;
use crate::ident::Ident;
use crate::session::Session;
use crate::value::{KeyedRecord, Value};

/// Row counts of a [`Table::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    /// Existing rows removed because they matched an incoming record.
    pub deleted: u64,
    pub inserted: u64,
}

impl MergeOutcome {
    /// Rows that did not exist before the merge.
    pub fn net_new(&self) -> i64 {
        self.inserted as i64 - self.deleted as i64
    }
}

/// Write helpers bound to one table of a [`Session`].
pub struct Table<'s, D: Driver> {
    session: &'s mut Session<D>,
    name: Ident,
}

fn columns<'a>(keys: impl IntoIterator<Item = &'a String>) -> DbResult<Vec<Ident>> {
    keys.into_iter().map(|k| Ident::parse(k)).collect()
}

/// `a = :p0 <sep> b = :p1 ...`
fn assignments(columns: &[Ident], prefix: &str, sep: &str) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{c} = :{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(sep)
}

fn insert_sql(table: &Ident, columns: &[Ident]) -> String {
    let names = columns.iter().map(Ident::to_string).collect::<Vec<_>>();
    let values = (0..columns.len()).map(|i| format!(":c{i}")).collect::<Vec<_>>();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        names.join(", "),
        values.join(", ")
    )
}

/// Values of `keys` from every record, in key order.
fn project(records: &[KeyedRecord], keys: &[&String]) -> DbResult<Vec<Vec<Value>>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            keys.iter()
                .map(|&k| {
                    r.get(k)
                        .cloned()
                        .ok_or_else(|| DbError::missing(k.as_str(), Some(i)))
                })
                .collect()
        })
        .collect()
}

impl<'s, D: Driver> Table<'s, D> {
    pub(crate) fn new(session: &'s mut Session<D>, name: &str) -> DbResult<Self> {
        Ok(Self {
            session,
            name: Ident::parse(name)?,
        })
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub async fn insert_one(&mut self, record: &KeyedRecord) -> DbResult<u64> {
        if record.is_empty() {
            return Err(DbError::validation("insert requires at least one column"));
        }
        let cols = columns(record.keys())?;
        let sql = insert_sql(&self.name, &cols);
        let row: Vec<Value> = record.values().cloned().collect();
        self.session.write(&sql, row).await
    }

    /// Insert every record. Columns come from the first record; the others must have
    /// at least those keys.
    pub async fn insert_many(&mut self, records: &[KeyedRecord]) -> DbResult<u64> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        if first.is_empty() {
            return Err(DbError::validation("insert requires at least one column"));
        }
        let keys: Vec<&String> = first.keys().collect();
        let cols = columns(keys.iter().copied())?;
        let rows = project(records, &keys)?;
        let sql = insert_sql(&self.name, &cols);
        self.session.write_many(&sql, Batch::Positional(rows)).await
    }

    /// `UPDATE ... SET changes WHERE condition`. An empty condition updates every row.
    pub async fn update(&mut self, condition: &KeyedRecord, changes: &KeyedRecord) -> DbResult<u64> {
        if changes.is_empty() {
            return Err(DbError::validation("update requires at least one change"));
        }
        let set_cols = columns(changes.keys())?;
        let where_cols = columns(condition.keys())?;

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.name,
            assignments(&set_cols, "u", ", ")
        );
        if !where_cols.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&assignments(&where_cols, "w", " AND "));
        }

        let row: Vec<Value> = changes.values().chain(condition.values()).cloned().collect();
        self.session.write(&sql, row).await
    }

    /// Delete the rows matching every `column = value` pair of `condition`.
    ///
    /// An empty condition is rejected; use [`Table::delete_all`] to empty the table.
    pub async fn delete(&mut self, condition: &KeyedRecord) -> DbResult<u64> {
        if condition.is_empty() {
            return Err(DbError::validation(
                "delete requires a condition; use delete_all to remove every row",
            ));
        }
        let cols = columns(condition.keys())?;
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            self.name,
            assignments(&cols, "w", " AND ")
        );
        let row: Vec<Value> = condition.values().cloned().collect();
        self.session.write(&sql, row).await
    }

    pub async fn delete_all(&mut self) -> DbResult<u64> {
        let sql = format!("DELETE FROM {}", self.name);
        self.session.execute(&sql, ()).await
    }

    /// Replace rows that collide with `records` on `unique`, then insert all records.
    ///
    /// Works on any database: conflicting rows are deleted first, so no upsert syntax is
    /// needed. Both statements run in one transaction that is committed once at the end,
    /// unless the session leaves commits to the caller. Chunks are never retried: any
    /// failure rolls the deletes back together with the inserts.
    pub async fn merge(&mut self, records: &[KeyedRecord], unique: &[&str]) -> DbResult<MergeOutcome> {
        if unique.is_empty() {
            return Err(DbError::validation("merge requires at least one unique column"));
        }
        let Some(first) = records.first() else {
            return Ok(MergeOutcome::default());
        };
        if first.is_empty() {
            return Err(DbError::validation("insert requires at least one column"));
        }

        let mut keys = Vec::with_capacity(unique.len());
        for &u in unique {
            let Some((key, _)) = first.get_key_value(u) else {
                return Err(DbError::validation(format!(
                    "unique column '{u}' is not among the record columns"
                )));
            };
            keys.push(key);
        }
        let all: Vec<&String> = first.keys().collect();

        let delete_sql = format!(
            "DELETE FROM {} WHERE {}",
            self.name,
            assignments(&columns(keys.iter().copied())?, "w", " AND ")
        );
        let insert = insert_sql(&self.name, &columns(all.iter().copied())?);
        let delete_rows = project(records, &keys)?;
        let insert_rows = project(records, &all)?;

        let deleted = self
            .session
            .write_many_atomic(&delete_sql, Batch::Positional(delete_rows))
            .await?;
        let inserted = self
            .session
            .write_many_atomic(&insert, Batch::Positional(insert_rows))
            .await?;
        if self.session.config().executor.commit_chunks {
            if let Err(err) = self.session.driver_mut().commit().await {
                return Err(rollback_after(self.session.driver_mut(), err).await);
            }
        }

        tracing::debug!(
            target: crate::logging::SQL_TARGET,
            table = %self.name,
            deleted,
            inserted,
            "merge"
        );
        Ok(MergeOutcome { deleted, inserted })
    }
}
