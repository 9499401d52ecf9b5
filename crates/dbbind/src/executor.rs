//! Adaptive batch execution.
//!
//! A batch is sent in chunks of [`ExecutorConfig::chunk_size`] records. When the database
//! rejects a chunk the executor rolls back, shrinks the chunk size by a factor of ten and
//! retries that span, dropping to one record at a time once chunks are small. Spans still
//! waiting to run keep their chunk size, so one bad record only slows down its own
//! neighbourhood.
//!
//! Pending spans live on an explicit work-list, so arbitrarily deep shrinking never grows
//! the call stack.

use crate::config::{ExecutorConfig, FailurePolicy, PER_RECORD_THRESHOLD};
use crate::driver::Driver;
use crate::error::{DbError, DbResult, RecordFailure};
use crate::logging::{SQL_TARGET, preview, truncate_sql};
use crate::value::Value;
use std::ops::Range;

/// Next chunk size after a chunk of `chunk_size` records failed within a span of
/// `length` records.
pub(crate) fn shrink(chunk_size: usize, length: usize) -> usize {
    let next = chunk_size.min(length) / 10;
    if next > PER_RECORD_THRESHOLD { next } else { 1 }
}

#[derive(Debug)]
struct Task {
    span: Range<usize>,
    chunk_size: usize,
    /// Length of the span this task's chunk size was chosen for.
    length: usize,
}

/// Affected rows, split by whether the open transaction still holds them.
#[derive(Debug, Default)]
struct Progress {
    committed: u64,
    /// Lost on the next rollback.
    pending: u64,
}

impl Progress {
    fn total(&self) -> u64 {
        self.committed + self.pending
    }

    fn discard(&mut self) {
        if self.pending > 0 {
            tracing::warn!(
                target: SQL_TARGET,
                rows = self.pending,
                "rollback discarded uncommitted rows"
            );
        }
        self.pending = 0;
    }
}

fn interrupted(err: DbError, chunk: Range<usize>, index: Option<usize>, applied: u64) -> DbError {
    DbError::Interrupted {
        index,
        chunk,
        applied,
        source: Box::new(err),
    }
}

/// Runs bound rows against a [`Driver`] with shrink-on-failure retries.
#[derive(Debug, Clone, Default)]
pub struct BatchExecutor {
    config: ExecutorConfig,
}

impl BatchExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `sql` once per row and return the total affected row count.
    ///
    /// Only rows that are still applied when the call returns are counted. With
    /// [`ExecutorConfig::no_commit`] a rollback before a retry also drops the rows of
    /// earlier chunks, and those rows leave the count. Errors:
    /// - [`DbError::Execution`] for the first record that fails on its own under
    ///   [`FailurePolicy::Abort`];
    /// - [`DbError::PartialBatch`] listing every failed record under
    ///   [`FailurePolicy::Isolate`];
    /// - [`DbError::Interrupted`] for a non-database error or a failed commit, after a
    ///   best-effort rollback;
    /// - [`DbError::RollbackFailed`] wrapping one of the above if rolling back fails too.
    pub async fn run<D: Driver>(
        &self,
        driver: &mut D,
        sql: &str,
        rows: &[Vec<Value>],
    ) -> DbResult<u64> {
        self.config.validate()?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut progress = Progress::default();
        let mut failures = Vec::new();
        let mut show_preview = self.config.verbose_first_chunk;
        let mut work = vec![Task {
            span: 0..rows.len(),
            chunk_size: self.config.chunk_size,
            length: rows.len(),
        }];

        while let Some(task) = work.pop() {
            let mut start = task.span.start;

            while start < task.span.end {
                let end = start.saturating_add(task.chunk_size).min(task.span.end);
                let chunk = &rows[start..end];

                if show_preview {
                    show_preview = false;
                    tracing::debug!(
                        target: SQL_TARGET,
                        sql = %truncate_sql(sql),
                        records = rows.len(),
                        preview = %preview(chunk),
                        "first chunk"
                    );
                }
                tracing::debug!(
                    target: SQL_TARGET,
                    start,
                    end,
                    chunk_size = task.chunk_size,
                    "execute_many"
                );

                let err = match driver.execute_many(sql, chunk).await {
                    Ok(count) => {
                        self.settle(driver, &mut progress, count, start..end, None)
                            .await?;
                        start = end;
                        continue;
                    }
                    Err(err) => err,
                };

                if !err.is_retryable() {
                    return Err(self
                        .interrupt(driver, &mut progress, err, start..end, None)
                        .await);
                }

                tracing::warn!(
                    target: SQL_TARGET,
                    start,
                    end,
                    chunk_size = task.chunk_size,
                    error = %err,
                    "chunk failed"
                );
                if let Err(rollback) = self.rollback(driver, &mut progress).await {
                    let err = interrupted(err, start..end, None, progress.total());
                    return Err(err.with_rollback_failure(rollback));
                }

                if task.chunk_size <= PER_RECORD_THRESHOLD || task.length <= PER_RECORD_THRESHOLD {
                    tracing::warn!(
                        target: SQL_TARGET,
                        start,
                        end,
                        "retrying chunk one record at a time"
                    );
                    self.run_records(driver, sql, rows, start..end, &mut progress, &mut failures)
                        .await?;
                    start = end;
                    continue;
                }

                let next = shrink(task.chunk_size, task.length);
                tracing::warn!(
                    target: SQL_TARGET,
                    start,
                    end,
                    from = task.chunk_size,
                    to = next,
                    "shrinking chunk size"
                );

                if end < task.span.end {
                    work.push(Task {
                        span: end..task.span.end,
                        chunk_size: task.chunk_size,
                        length: task.length,
                    });
                }
                work.push(Task {
                    span: start..end,
                    chunk_size: next,
                    length: end - start,
                });
                break;
            }
        }

        if failures.is_empty() {
            Ok(progress.total())
        } else {
            Err(DbError::PartialBatch {
                applied: progress.total(),
                failures,
            })
        }
    }

    /// Execute every chunk inside the open transaction, without retries or commits.
    ///
    /// Any failure rolls back the whole transaction, including work done before this
    /// call, and comes back as [`DbError::Interrupted`] with nothing applied.
    pub(crate) async fn run_atomic<D: Driver>(
        &self,
        driver: &mut D,
        sql: &str,
        rows: &[Vec<Value>],
    ) -> DbResult<u64> {
        self.config.validate()?;
        let mut applied = 0u64;
        let mut start = 0;

        while start < rows.len() {
            let end = start.saturating_add(self.config.chunk_size).min(rows.len());
            tracing::debug!(target: SQL_TARGET, start, end, "execute_many");
            match driver.execute_many(sql, &rows[start..end]).await {
                Ok(count) => applied += count,
                Err(err) => {
                    let err = interrupted(err, start..end, None, 0);
                    return Err(rollback_after(driver, err).await);
                }
            }
            start = end;
        }
        Ok(applied)
    }

    /// Execute a single parameter set. A failure is rolled back before it is returned.
    pub async fn run_one<D: Driver>(
        &self,
        driver: &mut D,
        sql: &str,
        params: &[Value],
    ) -> DbResult<u64> {
        tracing::debug!(
            target: SQL_TARGET,
            sql = %truncate_sql(sql),
            params = params.len(),
            "execute"
        );
        match driver.execute_one(sql, params).await {
            Ok(count) => Ok(count),
            Err(err) => Err(rollback_after(driver, err).await),
        }
    }

    async fn run_records<D: Driver>(
        &self,
        driver: &mut D,
        sql: &str,
        rows: &[Vec<Value>],
        chunk: Range<usize>,
        progress: &mut Progress,
        failures: &mut Vec<RecordFailure>,
    ) -> DbResult<()> {
        for index in chunk.clone() {
            let row = &rows[index];
            let err = match driver.execute_one(sql, row).await {
                Ok(count) => {
                    self.settle(driver, progress, count, chunk.clone(), Some(index))
                        .await?;
                    continue;
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(self
                    .interrupt(driver, progress, err, chunk, Some(index))
                    .await);
            }

            let record = format!("{row:?}");
            tracing::error!(
                target: SQL_TARGET,
                index,
                record = %record,
                error = %err,
                "record failed"
            );

            if let Err(rollback) = self.rollback(driver, progress).await {
                let err = DbError::Execution {
                    index,
                    chunk,
                    applied: progress.total(),
                    record,
                    source: Box::new(err),
                };
                return Err(err.with_rollback_failure(rollback));
            }

            match self.config.failure_policy {
                FailurePolicy::Abort => {
                    return Err(DbError::Execution {
                        index,
                        chunk,
                        applied: progress.total(),
                        record,
                        source: Box::new(err),
                    });
                }
                FailurePolicy::Isolate => failures.push(RecordFailure {
                    index,
                    record,
                    error: err,
                }),
            }
        }
        Ok(())
    }

    /// Account for `count` rows that just succeeded and commit them when configured to.
    async fn settle<D: Driver>(
        &self,
        driver: &mut D,
        progress: &mut Progress,
        count: u64,
        chunk: Range<usize>,
        index: Option<usize>,
    ) -> DbResult<()> {
        progress.pending += count;
        if !self.config.commit_chunks {
            return Ok(());
        }
        match driver.commit().await {
            Ok(()) => {
                progress.committed += progress.pending;
                progress.pending = 0;
                Ok(())
            }
            Err(err) => Err(self.interrupt(driver, progress, err, chunk, index).await),
        }
    }

    async fn rollback<D: Driver>(&self, driver: &mut D, progress: &mut Progress) -> DbResult<()> {
        let result = driver.rollback().await;
        if let Err(err) = &result {
            tracing::error!(target: SQL_TARGET, error = %err, "rollback failed");
        }
        progress.discard();
        result
    }

    /// Roll back after an error the executor does not retry and wrap it with the batch
    /// position.
    async fn interrupt<D: Driver>(
        &self,
        driver: &mut D,
        progress: &mut Progress,
        err: DbError,
        chunk: Range<usize>,
        index: Option<usize>,
    ) -> DbError {
        tracing::error!(
            target: SQL_TARGET,
            start = chunk.start,
            end = chunk.end,
            error = %err,
            "batch interrupted"
        );
        let rollback = self.rollback(driver, progress).await;
        let err = interrupted(err, chunk, index, progress.total());
        match rollback {
            Ok(()) => err,
            Err(rollback) => err.with_rollback_failure(rollback),
        }
    }
}

/// Best-effort rollback after `err`; a rollback failure is attached, never dropped.
pub(crate) async fn rollback_after<D: Driver>(driver: &mut D, err: DbError) -> DbError {
    match driver.rollback().await {
        Ok(()) => err,
        Err(rollback) => {
            tracing::error!(target: SQL_TARGET, error = %rollback, "rollback failed");
            err.with_rollback_failure(rollback)
        }
    }
}
