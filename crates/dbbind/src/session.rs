//! Compile, bind and execute in one call.

use crate::bind::{Args, Batch, Record};
use crate::compiler::{CompiledStatement, Compiler};
use crate::config::SessionConfig;
use crate::driver::Driver;
use crate::error::DbResult;
use crate::executor::BatchExecutor;
use crate::logging::SQL_TARGET;
use crate::paramstyle::ParamStyle;
use crate::table::Table;
use std::sync::Arc;

/// A driver plus everything needed to run named-placeholder SQL against it.
///
/// # Example
/// ```ignore
/// use dbbind::prelude::*;
///
/// let mut session = Session::new(dbbind::postgres::connect(&url).await?);
/// session
///     .write_many(
///         "insert into users (id, name) values (:id, :name)",
///         vec![record! { "id" => 1, "name" => "a" }, record! { "id" => 2, "name" => "b" }],
///     )
///     .await?;
/// ```
#[derive(Debug)]
pub struct Session<D: Driver> {
    driver: D,
    compiler: Compiler,
    executor: BatchExecutor,
    config: SessionConfig,
}

impl<D: Driver> Session<D> {
    /// Session with default configuration and the driver's own paramstyle.
    pub fn new(driver: D) -> Self {
        let style = driver.param_style();
        Self {
            driver,
            compiler: Compiler::new(style),
            executor: BatchExecutor::default(),
            config: SessionConfig::default(),
        }
    }

    pub fn with_config(driver: D, config: SessionConfig) -> DbResult<Self> {
        config.validate()?;
        let style = config.param_style.unwrap_or_else(|| driver.param_style());
        Ok(Self {
            driver,
            compiler: Compiler::with_cache(style, config.compile_cache),
            executor: BatchExecutor::new(config.executor.clone()),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn param_style(&self) -> ParamStyle {
        self.compiler.style()
    }

    pub fn compile(&self, sql: &str) -> DbResult<Arc<CompiledStatement>> {
        self.compiler.compile(sql)
    }

    /// Run `sql` with whatever `args` holds.
    ///
    /// A single record is executed once. A batch goes through the [`BatchExecutor`].
    /// Without parameters (or with an empty record) the SQL is sent as written; an empty
    /// batch does nothing and returns 0.
    pub async fn execute(&mut self, sql: &str, args: impl Into<Args>) -> DbResult<u64> {
        match args.into() {
            Args::Many(batch) => self.write_many(sql, batch).await,
            Args::One(record) if !record.is_empty() => self.write(sql, record).await,
            Args::One(_) | Args::None => {
                let count = self.executor.run_one(&mut self.driver, sql, &[]).await?;
                self.autocommit().await?;
                Ok(count)
            }
        }
    }

    /// Execute `sql` once for `record`.
    pub async fn write(&mut self, sql: &str, record: impl Into<Record>) -> DbResult<u64> {
        let stmt = self.compiler.compile(sql)?;
        let params = stmt.bind(record.into())?;
        let count = self
            .executor
            .run_one(&mut self.driver, stmt.sql(), &params)
            .await?;
        self.autocommit().await?;
        Ok(count)
    }

    /// Execute `sql` for every record of `batch` with adaptive chunking.
    pub async fn write_many(&mut self, sql: &str, batch: impl Into<Batch>) -> DbResult<u64> {
        let batch = batch.into();
        if batch.is_empty() {
            tracing::debug!(target: SQL_TARGET, "empty batch, nothing to execute");
            return Ok(0);
        }
        let stmt = self.compiler.compile(sql)?;
        let rows = stmt.bind_batch(batch)?;
        self.executor.run(&mut self.driver, stmt.sql(), &rows).await
    }

    /// Execute `batch` inside the open transaction without retries or commits.
    pub(crate) async fn write_many_atomic(&mut self, sql: &str, batch: Batch) -> DbResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        let stmt = self.compiler.compile(sql)?;
        let rows = stmt.bind_batch(batch)?;
        self.executor
            .run_atomic(&mut self.driver, stmt.sql(), &rows)
            .await
    }

    pub async fn commit(&mut self) -> DbResult<()> {
        self.driver.commit().await
    }

    pub async fn rollback(&mut self) -> DbResult<()> {
        self.driver.rollback().await
    }

    /// Write helpers for one table.
    pub fn table(&mut self, name: &str) -> DbResult<Table<'_, D>> {
        Table::new(self, name)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }

    async fn autocommit(&mut self) -> DbResult<()> {
        if self.config.autocommit {
            self.driver.commit().await?;
        }
        Ok(())
    }
}

