//! Error types for dbbind

use std::ops::Range;
use thiserror::Error;

/// Result type alias for dbbind operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for compiling, binding and executing statements
#[derive(Debug, Error)]
pub enum DbError {
    /// A `:` in the SQL that does not introduce a valid `:identifier` placeholder
    #[error("Malformed placeholder at byte {position}: {message}")]
    MalformedPlaceholder { position: usize, message: String },

    /// A keyed record lacks a key the statement references
    #[error("Missing parameter '{key}'{}", .record.map(|i| format!(" in record {i}")).unwrap_or_default())]
    MissingParameter { key: String, record: Option<usize> },

    /// The database rejected a statement. This is the only class the batch
    /// executor retries by shrinking.
    #[error("Database error: {message}")]
    Database {
        code: Option<String>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Postgres client error that did not come from the server (closed connection,
    /// type conversion, protocol)
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Programming or interface error reported by a driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// A single record failed after the batch shrank to per-record execution
    #[error(
        "Execution failed at record {index} (chunk {}..{}, {applied} rows applied): {source}",
        .chunk.start, .chunk.end
    )]
    Execution {
        /// Position of the failing record in the input batch
        index: usize,
        /// Bounds of the failed chunk in the input batch
        chunk: Range<usize>,
        /// Rows committed before the failure
        applied: u64,
        /// Debug rendering of the failing record
        record: String,
        source: Box<DbError>,
    },

    /// A batch stopped on an error the executor does not retry: a non-database driver
    /// error or a failed commit
    #[error(
        "Batch interrupted at {}chunk {}..{} ({applied} rows applied): {source}",
        .index.map(|i| format!("record {i}, ")).unwrap_or_default(),
        .chunk.start, .chunk.end
    )]
    Interrupted {
        /// Failing record, when the batch had already dropped to single records
        index: Option<usize>,
        chunk: Range<usize>,
        /// Rows applied before the failure
        applied: u64,
        source: Box<DbError>,
    },

    /// Records failed under [`FailurePolicy::Isolate`](crate::FailurePolicy::Isolate);
    /// every other record was applied
    #[error("Batch finished with {} failed record(s), {applied} rows applied", .failures.len())]
    PartialBatch {
        applied: u64,
        failures: Vec<RecordFailure>,
    },

    /// Rolling back after `error` failed as well
    #[error("{error} (rollback failed: {rollback})")]
    RollbackFailed {
        error: Box<DbError>,
        rollback: Box<DbError>,
    },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// One record that failed inside a batch.
#[derive(Debug)]
pub struct RecordFailure {
    /// Position of the record in the input batch
    pub index: usize,
    /// Debug rendering of the record's bound values
    pub record: String,
    pub error: DbError,
}

impl DbError {
    /// Create a database-class error (recoverable by the batch executor)
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create a database-class error carrying a SQLSTATE-like code
    pub fn database_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            code: Some(code.into()),
            message: message.into(),
            source: None,
        }
    }

    /// Create a driver (non-database) error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a missing parameter error
    pub fn missing(key: impl Into<String>, record: Option<usize>) -> Self {
        Self::MissingParameter {
            key: key.into(),
            record,
        }
    }

    /// Whether the database itself rejected the statement.
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database { .. })
    }

    /// Whether the batch executor may retry this error with a smaller chunk.
    pub fn is_retryable(&self) -> bool {
        self.is_database_error()
    }

    /// Check if this is a compile/bind error (a caller bug, never retried)
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedPlaceholder { .. } | Self::MissingParameter { .. }
        )
    }

    /// Rows applied before a batch failure, if this error came from a batch.
    pub fn applied_rows(&self) -> Option<u64> {
        match self {
            Self::Execution { applied, .. }
            | Self::Interrupted { applied, .. }
            | Self::PartialBatch { applied, .. } => Some(*applied),
            Self::RollbackFailed { error, .. } => error.applied_rows(),
            _ => None,
        }
    }

    /// SQLSTATE-like code of a database error, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Database { code, .. } => code.as_deref(),
            Self::Execution { source, .. } | Self::Interrupted { source, .. } => source.code(),
            Self::RollbackFailed { error, .. } => error.code(),
            _ => None,
        }
    }

    /// Attach a rollback failure to this error.
    pub(crate) fn with_rollback_failure(self, rollback: DbError) -> Self {
        Self::RollbackFailed {
            error: Box::new(self),
            rollback: Box::new(rollback),
        }
    }

    /// Classify a tokio_postgres error.
    ///
    /// Errors the server reported (`as_db_error()`) become [`DbError::Database`]; everything
    /// else (connection closed, parameter conversion) stays a [`DbError::Query`].
    #[cfg(feature = "postgres")]
    pub fn from_pg(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let code = db_err.code().code().to_string();
            let message = match db_err.constraint() {
                Some(constraint) => format!("{constraint}: {}", db_err.message()),
                None => db_err.message().to_string(),
            };
            return Self::Database {
                code: Some(code),
                message,
                source: Some(Box::new(err)),
            };
        }
        Self::Query(err)
    }
}
