#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use sqlx::sqlite::SqlitePoolOptions;
use strata_core::schema::probe::{SchemaCollection, SchemaRow};
use strata_core::schema::{Column, DataKind, Table};
use strata_core::{Dialect, DialectKind};
use strata_sync::{Result, SchemaSession, SchemaSync, SqliteSession, StaticCatalog, SyncConfig, SyncError};

/// A session over an in-memory table list that records every statement it
/// is asked to run. It never interprets DDL.
pub struct RecordingSession {
    name: String,
    dialect: &'static dyn Dialect,
    tables: Vec<Table>,
    failing_tables: Vec<String>,
    failing_sql: Vec<String>,
    delay: Option<Duration>,
    executed: Mutex<Vec<String>>,
    table_probes: AtomicUsize,
}

impl RecordingSession {
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            name: "main".to_string(),
            dialect: DialectKind::SqlServer.dialect(),
            tables,
            failing_tables: Vec::new(),
            failing_sql: Vec::new(),
            delay: None,
            executed: Mutex::new(Vec::new()),
            table_probes: AtomicUsize::new(0),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Column probes of `table` fail.
    pub fn failing_table(mut self, table: &str) -> Self {
        self.failing_tables.push(table.to_string());
        self
    }

    /// Statements containing `fragment` fail.
    pub fn failing_sql(mut self, fragment: &str) -> Self {
        self.failing_sql.push(fragment.to_string());
        self
    }

    /// Table listings take `delay` to answer.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn table_probes(&self) -> usize {
        self.table_probes.load(Ordering::SeqCst)
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| t.is_named(name))
            .ok_or_else(|| SyncError::Session(format!("no table {name}")))
    }

    fn column_row(&self, column: &Column) -> SchemaRow {
        let flag = |value: bool| if value { "1" } else { "0" };
        let mut plain = column.clone();
        plain.identity = false;
        SchemaRow::new()
            .with("COLUMN_NAME", column.name.as_str())
            .with("ORDINAL_POSITION", column.id.to_string())
            .with("DATA_TYPE", self.dialect.type_name(&plain))
            .with("IS_NULLABLE", flag(column.nullable))
            .with("IS_IDENTITY", flag(column.identity))
            .with("IS_PRIMARY_KEY", flag(column.primary_key))
            .with("COLUMN_DEFAULT", column.default.clone().unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl SchemaSession for RecordingSession {
    fn connection_name(&self) -> &str {
        &self.name
    }

    fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    async fn probe_schema(
        &self,
        collection: SchemaCollection,
        table: Option<&str>,
    ) -> Result<Vec<SchemaRow>> {
        match collection {
            SchemaCollection::Tables => {
                self.table_probes.fetch_add(1, Ordering::SeqCst);
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(self
                    .tables
                    .iter()
                    .filter(|t| table.is_none_or(|name| t.is_named(name)))
                    .map(|t| SchemaRow::new().with("TABLE_NAME", t.name()))
                    .collect())
            }
            SchemaCollection::Columns => {
                let name = table.unwrap_or_default();
                if self.failing_tables.iter().any(|f| f.eq_ignore_ascii_case(name)) {
                    return Err(SyncError::Session(format!("cannot read columns of {name}")));
                }
                Ok(self
                    .table(name)?
                    .columns()
                    .iter()
                    .map(|c| self.column_row(c))
                    .collect())
            }
            SchemaCollection::Indexes => {
                let name = table.unwrap_or_default();
                Ok(self
                    .table(name)?
                    .indexes
                    .iter()
                    .flat_map(|index| {
                        index.columns.iter().map(move |column| {
                            SchemaRow::new()
                                .with("INDEX_NAME", index.name_for(name))
                                .with("COLUMN_NAME", column.as_str())
                                .with("IS_UNIQUE", if index.unique { "1" } else { "0" })
                        })
                    })
                    .collect())
            }
            SchemaCollection::DataTypes => Ok(Vec::new()),
        }
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        self.executed.lock().push(sql.to_string());
        if self.failing_sql.iter().any(|f| sql.contains(f.as_str())) {
            return Err(SyncError::Session(format!("rejected: {sql}")));
        }
        Ok(0)
    }

    async fn query_scalar(&self, sql: &str) -> Result<Option<String>> {
        let count = self
            .tables
            .iter()
            .filter(|t| sql.contains(&format!("'{}'", t.name())))
            .count();
        Ok(Some(count.to_string()))
    }
}

/// The declared `Users` table.
pub fn users() -> Table {
    Table::new("Users")
        .with_column(Column::new("Id", DataKind::Int32).primary_key().identity())
        .with_column(Column::new("Name", DataKind::String).length(50).not_null())
        .with_column(
            Column::new("Created", DataKind::DateTime)
                .not_null()
                .default_value("getdate()"),
        )
}

pub fn orders() -> Table {
    Table::new("Orders")
        .with_column(Column::new("Id", DataKind::Int64).primary_key().identity())
        .with_column(Column::new("Total", DataKind::Decimal).length(18).scale(2).not_null())
}

/// Builds a reconciler over `session` declaring `declared`.
pub fn reconciler<S: SchemaSession + 'static>(
    session: Arc<S>,
    declared: Vec<Table>,
    config: SyncConfig,
) -> SchemaSync {
    SchemaSync::new(session, Arc::new(StaticCatalog::new(declared)), config)
}

pub async fn memory_session() -> SqliteSession {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    SqliteSession::new(pool)
}
