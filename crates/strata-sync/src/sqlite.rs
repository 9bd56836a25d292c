//! SQLite session over a sqlx connection pool.
//!
//! Schema collections come from the SQLite catalogue: `sqlite_master` for
//! tables, and the `pragma_table_info`, `pragma_index_list` and
//! `pragma_index_info` table-valued functions for columns and indexes.

use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use strata_core::schema::probe::{SchemaCollection, SchemaRow};
use strata_core::schema::{Column, DataKind};
use strata_core::{Dialect, DialectKind};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::session::SchemaSession;

/// Name SQLite gives the primary database of a connection.
const MAIN: &str = "main";

/// A [`SchemaSession`] backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteSession {
    pool: SqlitePool,
    name: String,
}

impl SqliteSession {
    /// Wraps an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            name: MAIN.to_string(),
        }
    }

    /// Opens a pool for `url`, creating the database file if needed.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Sets the connection name matched against the exclusion list.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn tables(&self, table: Option<&str>) -> Result<Vec<SchemaRow>> {
        let mut sql = String::from(
            "SELECT name, type FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'",
        );
        if table.is_some() {
            sql.push_str(" AND name = ? COLLATE NOCASE");
        }
        sql.push_str(" ORDER BY name");

        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        if let Some(table) = table {
            query = query.bind(table);
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(name, kind)| {
                SchemaRow::new()
                    .with("TABLE_NAME", name)
                    .with("TABLE_TYPE", if kind == "view" { "VIEW" } else { "BASE TABLE" })
                    .with("TABLE_OWNER", MAIN)
            })
            .collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<SchemaRow>> {
        // Only INTEGER PRIMARY KEY AUTOINCREMENT is reported as identity; a
        // bare rowid alias is an ordinary key.
        let create_sql = sqlx::query_scalar::<_, Option<String>>(
            "SELECT sql FROM sqlite_master WHERE name = ? COLLATE NOCASE",
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await?
        .flatten();
        let autoincrement = create_sql
            .is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT"));

        let rows = sqlx::query_as::<_, (i64, String, String, i64, Option<String>, i64)>(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?)",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        let key_columns = rows.iter().filter(|row| row.5 > 0).count();

        Ok(rows
            .into_iter()
            .map(|(cid, name, data_type, not_null, default, pk)| {
                let identity = autoincrement
                    && key_columns == 1
                    && pk > 0
                    && data_type.eq_ignore_ascii_case("INTEGER");
                SchemaRow::new()
                    .with("COLUMN_NAME", name)
                    .with("ORDINAL_POSITION", (cid + 1).to_string())
                    .with("DATA_TYPE", data_type)
                    .with("IS_NULLABLE", flag(not_null == 0))
                    .with("IS_IDENTITY", flag(identity))
                    .with("IS_PRIMARY_KEY", flag(pk > 0))
                    .with("COLUMN_DEFAULT", default.unwrap_or_default())
            })
            .collect())
    }

    async fn indexes(&self, table: &str) -> Result<Vec<SchemaRow>> {
        let indexes = sqlx::query_as::<_, (String, i64, String)>(
            "SELECT name, \"unique\", origin FROM pragma_index_list(?) ORDER BY name",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut rows = Vec::new();
        for (name, unique, origin) in indexes {
            // Indexes SQLite creates for PRIMARY KEY and UNIQUE constraints
            // belong to the table definition.
            if origin != "c" {
                continue;
            }
            let columns = sqlx::query_scalar::<_, Option<String>>(
                "SELECT name FROM pragma_index_info(?) ORDER BY seqno",
            )
            .bind(&name)
            .fetch_all(&self.pool)
            .await?;
            for column in columns.into_iter().flatten() {
                rows.push(
                    SchemaRow::new()
                        .with("INDEX_NAME", name.as_str())
                        .with("COLUMN_NAME", column)
                        .with("IS_UNIQUE", flag(unique != 0))
                        .with("IS_PRIMARY_KEY", flag(false)),
                );
            }
        }
        Ok(rows)
    }

    fn data_types() -> Vec<SchemaRow> {
        let dialect = DialectKind::Sqlite.dialect();
        DataKind::ALL
            .into_iter()
            .map(|kind| {
                SchemaRow::new()
                    .with("TYPE_NAME", dialect.type_name(&Column::new("", kind)))
                    .with("DATA_TYPE", kind.as_str())
            })
            .collect()
    }
}

const fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn restriction(collection: SchemaCollection, table: Option<&str>) -> Result<&str> {
    table.ok_or_else(|| SyncError::Session(format!("{collection} probe requires a table name")))
}

#[async_trait::async_trait]
impl SchemaSession for SqliteSession {
    fn connection_name(&self) -> &str {
        &self.name
    }

    fn dialect(&self) -> &'static dyn Dialect {
        DialectKind::Sqlite.dialect()
    }

    async fn probe_schema(
        &self,
        collection: SchemaCollection,
        table: Option<&str>,
    ) -> Result<Vec<SchemaRow>> {
        debug!(collection = %collection, table = ?table, "Probing schema");
        match collection {
            SchemaCollection::Tables => self.tables(table).await,
            SchemaCollection::Columns => self.columns(restriction(collection, table)?).await,
            SchemaCollection::Indexes => self.indexes(restriction(collection, table)?).await,
            SchemaCollection::DataTypes => Ok(Self::data_types()),
        }
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn query_scalar(&self, sql: &str) -> Result<Option<String>> {
        let Some(row) = sqlx::query(sql).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        if let Ok(value) = row.try_get::<Option<i64>, _>(0) {
            return Ok(value.map(|v| v.to_string()));
        }
        Ok(row.try_get::<Option<String>, _>(0)?)
    }
}
