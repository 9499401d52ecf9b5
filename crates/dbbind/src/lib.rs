//! # dbbind
//!
//! Write SQL once with `:name` placeholders and run it on any driver, whatever
//! placeholder convention that driver speaks.
//!
//! ## Features
//!
//! - **One placeholder syntax**: `:name` is rewritten to `?`, `%s`, `:p1` or `$1`
//!   (see [`ParamStyle`]); text inside `'...'` literals is never touched
//! - **Flexible parameters**: keyed records, positional rows, or batches of either
//! - **Adaptive batches**: bulk writes run in chunks that shrink around failing records,
//!   so every good row is applied and counted
//! - **Failure location**: the failing record's index, data and the rows already applied
//!   come back in the error
//! - **Table helpers**: insert, update, delete and merge without writing SQL
//!
//! ## Example
//!
//! ```ignore
//! use dbbind::prelude::*;
//!
//! let mut session = Session::new(dbbind::postgres::connect(&database_url).await?);
//!
//! let n = session
//!     .write("update users set name = :name where id = :id", record! { "id" => 1, "name" => "alice" })
//!     .await?;
//!
//! let rows: Vec<KeyedRecord> = load_rows();
//! let applied = session
//!     .write_many("insert into users (id, name) values (:id, :name)", rows)
//!     .await?;
//! session.commit().await?;
//! ```
//!
//! Compiling alone is a pure function:
//!
//! ```
//! use dbbind::{ParamStyle, compile};
//!
//! let stmt = compile("select :b, :a, :b", ParamStyle::Qmark).unwrap();
//! assert_eq!(stmt.sql(), "select ?, ?, ?");
//! assert_eq!(stmt.keys(), ["b", "a", "b"]);
//! ```

pub mod bind;
pub mod compiler;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod ident;
pub mod logging;
pub mod paramstyle;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod prelude;
pub mod session;
pub mod table;
pub mod value;

pub use bind::{Args, Batch, Record};
pub use compiler::{CompiledStatement, Compiler, compile, literal_spans};
pub use config::{
    DEFAULT_CHUNK_SIZE, ExecutorConfig, FailurePolicy, PER_RECORD_THRESHOLD, SessionConfig,
};
pub use driver::Driver;
pub use error::{DbError, DbResult, RecordFailure};
pub use executor::BatchExecutor;
pub use ident::Ident;
pub use paramstyle::ParamStyle;
#[cfg(feature = "postgres")]
pub use postgres::PgDriver;
pub use session::Session;
pub use table::{MergeOutcome, Table};
pub use value::{KeyedRecord, Value};
