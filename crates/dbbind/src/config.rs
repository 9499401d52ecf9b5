use crate::error::{DbError, DbResult};
use crate::paramstyle::ParamStyle;
use serde::{Deserialize, Serialize};

/// Records per `execute_many` call until a failure forces a smaller chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// At or below this chunk (or span) size a failed chunk is retried record by record.
pub const PER_RECORD_THRESHOLD: usize = 10;

/// What the executor does with a record that fails on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing record.
    #[default]
    Abort,
    /// Skip failing records, apply the rest and report every failure at the end.
    Isolate,
}

/// Configuration for [`BatchExecutor`](crate::BatchExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Records per chunk before any shrinking.
    pub chunk_size: usize,
    /// Log the SQL and a preview of the first chunk's records.
    pub verbose_first_chunk: bool,
    /// Commit after each successful chunk or record.
    pub commit_chunks: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            verbose_first_chunk: false,
            commit_chunks: true,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose_first_chunk = true;
        self
    }

    /// Leave transaction control to the caller.
    pub fn no_commit(mut self) -> Self {
        self.commit_chunks = false;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn isolate_failures(self) -> Self {
        self.failure_policy(FailurePolicy::Isolate)
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.chunk_size == 0 {
            return Err(DbError::Config("chunk_size must be positive".into()));
        }
        Ok(())
    }
}

/// Configuration for [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Overrides the driver's paramstyle.
    pub param_style: Option<ParamStyle>,
    pub executor: ExecutorConfig,
    /// Compiled statements kept in the LRU; 0 disables the cache.
    pub compile_cache: usize,
    /// Commit after each single-record `execute`/`write`.
    pub autocommit: bool,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param_style(mut self, style: ParamStyle) -> Self {
        self.param_style = Some(style);
        self
    }

    pub fn executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    pub fn compile_cache(mut self, capacity: usize) -> Self {
        self.compile_cache = capacity;
        self
    }

    pub fn autocommit(mut self, on: bool) -> Self {
        self.autocommit = on;
        self
    }

    pub fn validate(&self) -> DbResult<()> {
        self.executor.validate()
    }
}
