//! The seam between the binding layer and a concrete database client.

use crate::error::DbResult;
use crate::paramstyle::ParamStyle;
use crate::value::Value;
use std::future::Future;

/// A database connection the executor can drive.
///
/// Methods take `&mut self`: a batch owns the connection until it finishes, so chunks
/// never interleave with other work on the same connection.
///
/// Implementations report server-side rejections as
/// [`DbError::Database`](crate::DbError::Database); the executor only retries those.
pub trait Driver: Send {
    /// Placeholder convention this driver expects.
    fn param_style(&self) -> ParamStyle;

    /// Execute `sql` once and return the affected row count.
    fn execute_one(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = DbResult<u64>> + Send;

    /// Execute `sql` once per row and return the summed row count.
    ///
    /// The default implementation loops [`Driver::execute_one`] and stops at the first
    /// error.
    fn execute_many(
        &mut self,
        sql: &str,
        rows: &[Vec<Value>],
    ) -> impl Future<Output = DbResult<u64>> + Send {
        async move {
            let mut total = 0;
            for row in rows {
                total += self.execute_one(sql, row).await?;
            }
            Ok(total)
        }
    }

    /// Discard everything since the last commit.
    fn rollback(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = DbResult<()>> + Send;
}

impl<D: Driver> Driver for &mut D {
    fn param_style(&self) -> ParamStyle {
        (**self).param_style()
    }

    async fn execute_one(&mut self, sql: &str, params: &[Value]) -> DbResult<u64> {
        (**self).execute_one(sql, params).await
    }

    async fn execute_many(&mut self, sql: &str, rows: &[Vec<Value>]) -> DbResult<u64> {
        (**self).execute_many(sql, rows).await
    }

    async fn rollback(&mut self) -> DbResult<()> {
        (**self).rollback().await
    }

    async fn commit(&mut self) -> DbResult<()> {
        (**self).commit().await
    }
}
