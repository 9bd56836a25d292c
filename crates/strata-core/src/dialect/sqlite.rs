//! SQLite dialect.

use super::{
    Dialect, DialectKind, PagingStyle, RenderResult, bounded_length, decimal_args, quote_literal,
    split_raw_type,
};
use crate::schema::{Column, DataKind};

/// SQLite dialect.
///
/// SQLite cannot alter a column in place and has nowhere to keep
/// descriptions or named defaults, so those operations render as `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn paging(&self) -> PagingStyle {
        PagingStyle::LimitOffset
    }

    fn long_text_threshold(&self) -> i32 {
        8000
    }

    fn now_literal(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    fn type_name(&self, column: &Column) -> String {
        if column.identity && column.primary_key {
            // Only INTEGER PRIMARY KEY aliases the rowid.
            return "INTEGER".to_string();
        }
        match column.data_kind {
            DataKind::Boolean => "BOOLEAN".to_string(),
            DataKind::Byte => "TINYINT".to_string(),
            DataKind::Int16 => "SMALLINT".to_string(),
            DataKind::Int32 => "INT".to_string(),
            DataKind::Int64 => "BIGINT".to_string(),
            DataKind::Single => "REAL".to_string(),
            DataKind::Double => "DOUBLE".to_string(),
            DataKind::Decimal => {
                let (precision, scale) = decimal_args(column);
                format!("DECIMAL({precision},{scale})")
            }
            DataKind::DateTime => "DATETIME".to_string(),
            DataKind::Guid => "UNIQUEIDENTIFIER".to_string(),
            DataKind::String => match bounded_length(column, self.long_text_threshold()) {
                Some(n) => format!("NVARCHAR({n})"),
                None => "TEXT".to_string(),
            },
            DataKind::Binary => "BLOB".to_string(),
        }
    }

    fn data_kind_of(&self, raw_type: &str) -> DataKind {
        let (base, _) = split_raw_type(raw_type);
        match base.as_str() {
            "BOOLEAN" | "BOOL" | "BIT" => DataKind::Boolean,
            "TINYINT" => DataKind::Byte,
            "SMALLINT" => DataKind::Int16,
            "INT" | "MEDIUMINT" => DataKind::Int32,
            "INTEGER" | "BIGINT" => DataKind::Int64,
            "REAL" => DataKind::Single,
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" => DataKind::Double,
            "DECIMAL" | "NUMERIC" => DataKind::Decimal,
            "DATETIME" | "DATE" | "TIMESTAMP" => DataKind::DateTime,
            "UNIQUEIDENTIFIER" | "GUID" | "UUID" => DataKind::Guid,
            "BLOB" | "" => DataKind::Binary,
            // Column affinity rules for everything else.
            other if other.contains("INT") => DataKind::Int64,
            other if other.contains("BLOB") || other.contains("BINARY") => DataKind::Binary,
            other if other.contains("REAL") || other.contains("FLOA") || other.contains("DOUB") => {
                DataKind::Double
            }
            _ => DataKind::String,
        }
    }

    /// Every integer kind shares one storage class.
    fn kinds_equivalent(&self, a: DataKind, b: DataKind) -> bool {
        a == b || (a.is_integer() && b.is_integer())
    }

    fn identity_suffix(&self, column: &Column, standalone: bool) -> &'static str {
        if standalone && column.primary_key {
            " AUTOINCREMENT"
        } else {
            ""
        }
    }

    fn limit_clause(&self, offset: u64, max_rows: u64) -> String {
        match (offset, max_rows) {
            (0, max) => format!("LIMIT {max}"),
            (off, 0) => format!("LIMIT -1 OFFSET {off}"),
            (off, max) => format!("LIMIT {max} OFFSET {off}"),
        }
    }

    fn create_database(&self, _name: &str, _path: Option<&str>) -> RenderResult {
        Ok(None)
    }

    fn drop_database(&self, _name: &str) -> RenderResult {
        Ok(None)
    }

    fn database_exists(&self, _name: &str) -> RenderResult {
        Ok(None)
    }

    fn table_exists(&self, name: &str) -> RenderResult {
        Ok(Some(format!(
            "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = {}",
            quote_literal(name)
        )))
    }

    fn alter_column(&self, _table: &str, _column: &Column, _previous: &Column) -> RenderResult {
        Ok(None)
    }

    fn add_default(&self, _table: &str, _column: &Column) -> RenderResult {
        Ok(None)
    }

    fn drop_default(&self, _table: &str, _column: &Column) -> RenderResult {
        Ok(None)
    }
}
