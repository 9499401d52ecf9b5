//! PostgreSQL driver backed by `tokio-postgres`.

use crate::driver::Driver;
use crate::error::{DbError, DbResult};
use crate::paramstyle::ParamStyle;
use crate::value::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

/// A [`Driver`] over one `tokio_postgres::Client`.
///
/// Writes run inside a transaction opened lazily with `BEGIN`; [`Driver::commit`] and
/// [`Driver::rollback`] close it. Nothing is sent for either when no transaction is open.
#[derive(Debug)]
pub struct PgDriver {
    client: Client,
    in_transaction: bool,
}

/// Connect to `url` without TLS and spawn the connection task onto the current runtime.
pub async fn connect(url: &str) -> DbResult<PgDriver> {
    PgDriver::connect(url).await
}

fn params_ref(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl PgDriver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            in_transaction: false,
        }
    }

    pub async fn connect(url: &str) -> DbResult<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: crate::logging::SQL_TARGET, error = %e, "connection closed");
            }
        });
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Give the client back. An open transaction is left as is.
    pub fn into_inner(self) -> Client {
        self.client
    }

    async fn begin(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            self.client
                .batch_execute("BEGIN")
                .await
                .map_err(DbError::from_pg)?;
            self.in_transaction = true;
        }
        Ok(())
    }

    async fn finish(&mut self, command: &str) -> DbResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.client
            .batch_execute(command)
            .await
            .map_err(DbError::from_pg)
    }
}

impl Driver for PgDriver {
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Dollar
    }

    async fn execute_one(&mut self, sql: &str, params: &[Value]) -> DbResult<u64> {
        self.begin().await?;
        self.client
            .execute(sql, &params_ref(params))
            .await
            .map_err(DbError::from_pg)
    }

    async fn execute_many(&mut self, sql: &str, rows: &[Vec<Value>]) -> DbResult<u64> {
        self.begin().await?;
        let stmt = self.client.prepare(sql).await.map_err(DbError::from_pg)?;
        let mut total = 0;
        for row in rows {
            total += self
                .client
                .execute(&stmt, &params_ref(row))
                .await
                .map_err(DbError::from_pg)?;
        }
        Ok(total)
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.finish("ROLLBACK").await
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.finish("COMMIT").await
    }
}
