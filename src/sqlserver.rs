//! Live SQL Server session
//!
//! tiberius is async; the engine is strictly sequential, so the session owns
//! a current-thread tokio runtime and blocks on each round trip.

use std::time::Duration;

use tiberius::{Client, Row, ToSql};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

use crate::catalog::{
    queries, Catalog, ClusteredIndexRef, ObjectId, ObjectKind, SchemaBoundObject, TargetRelation,
};
use crate::config::{SqlServerConfig, UnbindOptions};
use crate::error::{Result, UnbindError};
use crate::executor::{DdlStatement, ExecError, StatementExecutor};

/// Type alias for the SQL client
type SqlClient = Client<Compat<TcpStream>>;

/// A single connection used both for catalog reads and DDL execution
pub struct SqlServerSession {
    runtime: Runtime,
    client: SqlClient,
}

impl SqlServerSession {
    /// Connect once, without retrying.
    pub fn connect(config: &SqlServerConfig) -> Result<Self> {
        Self::connect_with_retry(config, 1, Duration::ZERO)
    }

    /// Connect using the retry policy in `options` (`connect_retries`, `retry_delay`).
    pub fn connect_with_options(config: &SqlServerConfig, options: &UnbindOptions) -> Result<Self> {
        Self::connect_with_retry(config, options.connect_retries, options.retry_delay)
    }

    /// Connect, retrying up to `attempts` times with `delay` between attempts.
    pub fn connect_with_retry(
        config: &SqlServerConfig,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self> {
        let tiberius_config = config.to_tiberius()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| UnbindError::catalog("runtime start", e))?;

        let attempts = attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match runtime.block_on(open_client(tiberius_config.clone())) {
                Ok(client) => {
                    debug!(addr = %tiberius_config.get_addr(), attempt, "connected to SQL Server");
                    return Ok(Self { runtime, client });
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "SQL Server connection failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        Err(UnbindError::CatalogUnavailable {
            operation: "connect".to_string(),
            message: format!("gave up after {} attempt(s): {}", attempts, last_error),
        })
    }

    fn query_rows(&mut self, operation: &str, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>> {
        let client = &mut self.client;
        self.runtime
            .block_on(async {
                let stream = client.query(sql, params).await?;
                stream.into_first_result().await
            })
            .map_err(|e| UnbindError::catalog(operation, e))
    }
}

async fn open_client(config: tiberius::Config) -> std::result::Result<SqlClient, ExecError> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    let client = Client::connect(config, tcp.compat_write()).await?;
    Ok(client)
}

fn column_str(row: &Row, column: &str, operation: &str) -> Result<String> {
    row.try_get::<&str, _>(column)
        .map_err(|e| UnbindError::catalog(operation, e))?
        .map(str::to_string)
        .ok_or_else(|| UnbindError::catalog(operation, format!("NULL in column {}", column)))
}

fn column_i32(row: &Row, column: &str, operation: &str) -> Result<i32> {
    row.try_get::<i32, _>(column)
        .map_err(|e| UnbindError::catalog(operation, e))?
        .ok_or_else(|| UnbindError::catalog(operation, format!("NULL in column {}", column)))
}

impl Catalog for SqlServerSession {
    fn resolve_relation(&mut self, target: &TargetRelation) -> Result<ObjectId> {
        let op = "resolve relation";
        let rows = self.query_rows(
            op,
            queries::RESOLVE_OBJECT,
            &[&target.schema.as_str(), &target.name.as_str()],
        )?;
        match rows.first() {
            Some(row) => Ok(ObjectId(column_i32(row, "object_id", op)?)),
            None => Err(UnbindError::ObjectNotFound {
                schema: target.schema.clone(),
                name: target.name.clone(),
            }),
        }
    }

    fn get_dependents_of(&mut self, object_id: ObjectId) -> Result<Vec<SchemaBoundObject>> {
        let op = "read schema-bound dependents";
        let rows = self.query_rows(op, queries::SCHEMA_BOUND_DEPENDENTS, &[&object_id.0])?;

        let mut objects = Vec::with_capacity(rows.len());
        for row in &rows {
            let type_code = column_str(row, "type_code", op)?;
            let Some(kind) = ObjectKind::from_type_code(&type_code) else {
                continue;
            };
            objects.push(SchemaBoundObject {
                object_id: ObjectId(column_i32(row, "object_id", op)?),
                schema: column_str(row, "schema_name", op)?,
                name: column_str(row, "object_name", op)?,
                kind,
                definition: column_str(row, "definition", op)?,
                level: 0,
            });
        }
        Ok(objects)
    }

    fn get_definition(&mut self, object_id: ObjectId) -> Result<Option<String>> {
        let op = "read definition";
        let rows = self.query_rows(op, queries::OBJECT_DEFINITION, &[&object_id.0])?;
        match rows.first() {
            Some(row) => Ok(row
                .try_get::<&str, _>("definition")
                .map_err(|e| UnbindError::catalog(op, e))?
                .map(str::to_string)),
            None => Ok(None),
        }
    }

    fn get_clustered_indexes(&mut self, object_id: ObjectId) -> Result<Vec<ClusteredIndexRef>> {
        let op = "read clustered indexes";
        let rows = self.query_rows(op, queries::CLUSTERED_INDEXES, &[&object_id.0])?;
        rows.iter()
            .map(|row| {
                Ok(ClusteredIndexRef {
                    index_name: column_str(row, "index_name", op)?,
                    owner_schema: column_str(row, "schema_name", op)?,
                    owner_name: column_str(row, "object_name", op)?,
                })
            })
            .collect()
    }
}

impl StatementExecutor for SqlServerSession {
    fn execute(&mut self, statement: &DdlStatement) -> std::result::Result<(), ExecError> {
        let client = &mut self.client;
        // Sent as a raw batch: ALTER VIEW/FUNCTION/PROCEDURE must start a batch
        self.runtime.block_on(async {
            client
                .simple_query(statement.text())
                .await?
                .into_results()
                .await
        })?;
        Ok(())
    }
}
