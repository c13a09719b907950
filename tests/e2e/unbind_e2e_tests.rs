//! End-to-end tests against a live SQL Server
//!
//! Each test creates a scratch database, builds a schema-bound dependency
//! chain on `Sales.Orders`, unbinds it through [`SqlServerSession`], then
//! drops the database again.
//!
//! Environment variables (with defaults):
//! - SQL_SERVER_HOST (default: localhost)
//! - SQL_SERVER_PORT (default: 1433)
//! - SQL_SERVER_USER (default: sa)
//! - SQL_SERVER_PASSWORD (default: Password1)
//!
//! Run with: cargo test --test e2e_tests -- --ignored

use tiberius::{Client, Row};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use sql_unbind::rewrite::has_schema_binding;
use sql_unbind::{unbind, SqlServerConfig, SqlServerSession, UnbindError, UnbindOptions};

type SqlClient = Client<Compat<TcpStream>>;

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

const SCHEMA_SETUP: &[&str] = &[
    "CREATE SCHEMA [Sales]",
    "CREATE TABLE [Sales].[Orders] (
        [OrderId] INT NOT NULL PRIMARY KEY,
        [CustomerId] INT NOT NULL,
        [Amount] DECIMAL(18, 2) NOT NULL
    )",
    "CREATE VIEW [Sales].[vOrderTotals]
WITH SCHEMABINDING
AS
SELECT o.CustomerId, SUM(o.Amount) AS Total, COUNT_BIG(*) AS OrderCount
FROM [Sales].[Orders] AS o
GROUP BY o.CustomerId",
    "CREATE UNIQUE CLUSTERED INDEX [IX_vOrderTotals_CustomerId] ON [Sales].[vOrderTotals] ([CustomerId])",
    "CREATE FUNCTION [Sales].[fnOrderSummary](@CustomerId INT)
RETURNS TABLE
WITH SCHEMABINDING
AS
RETURN SELECT t.Total FROM [Sales].[vOrderTotals] AS t WHERE t.CustomerId = @CustomerId",
];

/// Scratch database created for one test and dropped afterwards
struct ScratchDatabase {
    name: String,
    runtime: Runtime,
}

impl ScratchDatabase {
    fn create(name: &str) -> TestResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let scratch = Self {
            name: name.to_string(),
            runtime,
        };
        scratch.drop_if_exists()?;
        scratch.batch(None, &format!("CREATE DATABASE [{}]", name))?;
        for sql in SCHEMA_SETUP {
            scratch.batch(Some(name), sql)?;
        }
        Ok(scratch)
    }

    fn config(&self) -> SqlServerConfig {
        SqlServerConfig {
            database: Some(self.name.clone()),
            connection_string: None,
            ..SqlServerConfig::from_env().expect("environment should hold a valid config")
        }
    }

    fn batch(&self, database: Option<&str>, sql: &str) -> TestResult<()> {
        self.runtime.block_on(async {
            let mut client = connect(database).await?;
            client.simple_query(sql).await?.into_results().await?;
            Ok::<_, Box<dyn std::error::Error>>(())
        })
    }

    fn definition(&self, schema: &str, name: &str) -> TestResult<String> {
        let db = self.name.clone();
        self.runtime.block_on(async {
            let mut client = connect(Some(&db)).await?;
            let row: Option<Row> = client
                .query(
                    "SELECT m.definition FROM sys.sql_modules AS m WHERE m.object_id = OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2))",
                    &[&schema, &name],
                )
                .await?
                .into_row()
                .await?;
            Ok::<_, Box<dyn std::error::Error>>(
                row.and_then(|r| r.get::<&str, _>(0).map(str::to_string))
                    .unwrap_or_default(),
            )
        })
    }

    fn clustered_index_count(&self) -> TestResult<i32> {
        let db = self.name.clone();
        self.runtime.block_on(async {
            let mut client = connect(Some(&db)).await?;
            let row = client
                .query(
                    "SELECT COUNT(*) FROM sys.indexes WHERE object_id = OBJECT_ID('[Sales].[vOrderTotals]') AND type = 1",
                    &[],
                )
                .await?
                .into_row()
                .await?;
            Ok::<_, Box<dyn std::error::Error>>(row.and_then(|r| r.get::<i32, _>(0)).unwrap_or(0))
        })
    }

    fn drop_if_exists(&self) -> TestResult<()> {
        self.batch(
            None,
            &format!(
                "IF EXISTS (SELECT 1 FROM sys.databases WHERE name = '{0}') \
                 BEGIN \
                     ALTER DATABASE [{0}] SET SINGLE_USER WITH ROLLBACK IMMEDIATE; \
                     DROP DATABASE [{0}]; \
                 END",
                self.name
            ),
        )
    }
}

impl Drop for ScratchDatabase {
    fn drop(&mut self) {
        let _ = self.drop_if_exists();
    }
}

async fn connect(database: Option<&str>) -> TestResult<SqlClient> {
    let mut settings = SqlServerConfig::from_env()?;
    settings.database = database.map(str::to_string);
    let config = settings.to_tiberius()?;
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Ok(Client::connect(config, tcp.compat_write()).await?)
}

// ============================================================================
// E2E Tests - requires running SQL Server
// ============================================================================

#[test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
fn test_e2e_unbind_sales_orders() {
    let scratch = ScratchDatabase::create("SqlUnbind_E2E_Orders").expect("Should create scratch database");
    let options = UnbindOptions::default();
    let mut session =
        SqlServerSession::connect_with_options(&scratch.config(), &options).expect("Should connect");

    let report = unbind(&mut session, "Sales", "Orders", &options)
        .expect("Unbind should succeed");

    assert_eq!(report.processed_count, 2);
    assert_eq!(report.entries[0].name, "[Sales].[fnOrderSummary]");
    assert_eq!(report.entries[1].name, "[Sales].[vOrderTotals]");
    assert_eq!(report.dropped_indexes.len(), 1);
    assert_eq!(scratch.clustered_index_count().unwrap(), 0);

    let view = scratch.definition("Sales", "vOrderTotals").unwrap();
    let function = scratch.definition("Sales", "fnOrderSummary").unwrap();
    assert!(!has_schema_binding(&view), "view still bound: {}", view);
    assert!(!has_schema_binding(&function), "function still bound: {}", function);

    // The relation is now free to change
    scratch
        .batch(
            Some(&scratch.name),
            "ALTER TABLE [Sales].[Orders] ALTER COLUMN [Amount] DECIMAL(19, 4) NOT NULL",
        )
        .expect("Relation should be alterable after unbind");

    println!("{}", report.summary());
}

#[test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
fn test_e2e_second_run_is_a_no_op() {
    let scratch = ScratchDatabase::create("SqlUnbind_E2E_Rerun").expect("Should create scratch database");
    let options = UnbindOptions {
        verify: true,
        ..UnbindOptions::default()
    };
    let mut session =
        SqlServerSession::connect_with_options(&scratch.config(), &options).expect("Should connect");

    unbind(&mut session, "Sales", "Orders", &options).expect("First run should succeed");
    let report = unbind(&mut session, "Sales", "Orders", &options).expect("Second run should succeed");

    assert_eq!(report.processed_count, 0);
    assert!(report.statements.is_empty());
}

#[test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
fn test_e2e_dry_run_leaves_catalog_untouched() {
    let scratch = ScratchDatabase::create("SqlUnbind_E2E_DryRun").expect("Should create scratch database");
    let options = UnbindOptions {
        dry_run: true,
        ..UnbindOptions::default()
    };
    let mut session =
        SqlServerSession::connect_with_options(&scratch.config(), &options).expect("Should connect");

    let report = unbind(&mut session, "Sales", "Orders", &options).expect("Dry run should succeed");

    assert_eq!(report.statements.len(), 3);
    assert_eq!(scratch.clustered_index_count().unwrap(), 1);
    assert!(has_schema_binding(&scratch.definition("Sales", "vOrderTotals").unwrap()));
}

#[test]
#[ignore = "Requires SQL Server (configure via .env or environment variables)"]
fn test_e2e_unknown_relation() {
    let scratch = ScratchDatabase::create("SqlUnbind_E2E_Missing").expect("Should create scratch database");
    let options = UnbindOptions::default();
    let mut session =
        SqlServerSession::connect_with_options(&scratch.config(), &options).expect("Should connect");

    let err = unbind(&mut session, "Sales", "DoesNotExist", &options).unwrap_err();
    assert!(matches!(err, UnbindError::ObjectNotFound { .. }));
}
