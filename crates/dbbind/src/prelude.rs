//! Common imports:
//!
//! ```ignore
//! use dbbind::prelude::*;
//! ```

pub use crate::{
    Args, Batch, DbError, DbResult, Driver, ExecutorConfig, FailurePolicy, KeyedRecord,
    ParamStyle, Record, Session, SessionConfig, Value, record,
};

#[cfg(feature = "postgres")]
pub use crate::PgDriver;
