//! MySQL / MariaDB dialect.

use super::{
    Dialect, DialectKind, PagingStyle, RenderResult, base_field_clause, bounded_length,
    decimal_args, quote_literal, split_raw_type,
};
use crate::schema::{Column, DataKind, Index};

/// MySQL dialect. Descriptions are stored as inline `COMMENT`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn modify_column(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.format_name(table),
            self.field_clause(column, false)
        )
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn paging(&self) -> PagingStyle {
        PagingStyle::LimitOffset
    }

    fn now_literal(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    fn quote_chars(&self) -> (char, char) {
        ('`', '`')
    }

    fn supports_descriptions(&self) -> bool {
        true
    }

    fn type_name(&self, column: &Column) -> String {
        match column.data_kind {
            DataKind::Boolean => "TINYINT(1)".to_string(),
            DataKind::Byte => "TINYINT UNSIGNED".to_string(),
            DataKind::Int16 => "SMALLINT".to_string(),
            DataKind::Int32 => "INT".to_string(),
            DataKind::Int64 => "BIGINT".to_string(),
            DataKind::Single => "FLOAT".to_string(),
            DataKind::Double => "DOUBLE".to_string(),
            DataKind::Decimal => {
                let (precision, scale) = decimal_args(column);
                format!("DECIMAL({precision},{scale})")
            }
            DataKind::DateTime => "DATETIME".to_string(),
            DataKind::Guid => "CHAR(36)".to_string(),
            DataKind::String => match bounded_length(column, self.long_text_threshold()) {
                Some(n) => format!("VARCHAR({n})"),
                None => "LONGTEXT".to_string(),
            },
            DataKind::Binary => match bounded_length(column, self.long_text_threshold()) {
                Some(n) => format!("VARBINARY({n})"),
                None => "LONGBLOB".to_string(),
            },
        }
    }

    fn data_kind_of(&self, raw_type: &str) -> DataKind {
        let (base, args) = split_raw_type(raw_type);
        let base = base.trim_end_matches(" UNSIGNED");
        match base {
            "TINYINT" if args.first().is_some_and(|a| a == "1") => DataKind::Boolean,
            "BOOLEAN" | "BOOL" | "BIT" => DataKind::Boolean,
            "TINYINT" => DataKind::Byte,
            "SMALLINT" => DataKind::Int16,
            "INT" | "INTEGER" | "MEDIUMINT" => DataKind::Int32,
            "BIGINT" => DataKind::Int64,
            "FLOAT" => DataKind::Single,
            "DOUBLE" | "REAL" => DataKind::Double,
            "DECIMAL" | "NUMERIC" => DataKind::Decimal,
            "DATETIME" | "TIMESTAMP" | "DATE" => DataKind::DateTime,
            b if b.ends_with("BLOB") || b.ends_with("BINARY") => DataKind::Binary,
            _ => DataKind::String,
        }
    }

    /// GUIDs are stored as `CHAR(36)`.
    fn kinds_equivalent(&self, a: DataKind, b: DataKind) -> bool {
        let text = |k: DataKind| if k == DataKind::Guid { DataKind::String } else { k };
        text(a) == text(b)
    }

    fn identity_suffix(&self, _column: &Column, _standalone: bool) -> &'static str {
        " AUTO_INCREMENT"
    }

    fn field_clause(&self, column: &Column, standalone: bool) -> String {
        let mut sql = base_field_clause(self, column, standalone);
        if !column.description.is_empty() {
            sql.push_str(" COMMENT ");
            sql.push_str(&quote_literal(&column.description));
        }
        sql
    }

    fn limit_clause(&self, offset: u64, max_rows: u64) -> String {
        match (offset, max_rows) {
            (0, max) => format!("LIMIT {max}"),
            (off, 0) => format!("LIMIT {off}, {}", u64::MAX),
            (off, max) => format!("LIMIT {off}, {max}"),
        }
    }

    fn create_database(&self, name: &str, _path: Option<&str>) -> RenderResult {
        Ok(Some(format!("CREATE DATABASE {}", self.format_name(name))))
    }

    fn drop_database(&self, name: &str) -> RenderResult {
        Ok(Some(format!("DROP DATABASE {}", self.format_name(name))))
    }

    fn database_exists(&self, name: &str) -> RenderResult {
        Ok(Some(format!(
            "SELECT 1 FROM information_schema.schemata WHERE schema_name = {}",
            quote_literal(name)
        )))
    }

    fn table_exists(&self, name: &str) -> RenderResult {
        Ok(Some(format!(
            "SELECT 1 FROM information_schema.tables WHERE table_schema = DATABASE() \
             AND table_name = {}",
            quote_literal(name)
        )))
    }

    fn add_table_description(&self, table: &str, description: &str) -> RenderResult {
        Ok(Some(format!(
            "ALTER TABLE {} COMMENT = {}",
            self.format_name(table),
            quote_literal(description)
        )))
    }

    fn drop_table_description(&self, table: &str) -> RenderResult {
        Ok(Some(format!(
            "ALTER TABLE {} COMMENT = ''",
            self.format_name(table)
        )))
    }

    fn alter_column(&self, table: &str, column: &Column, _previous: &Column) -> RenderResult {
        Ok(Some(self.modify_column(table, column)))
    }

    /// Restates the column with its comment.
    fn add_column_description(&self, table: &str, column: &Column) -> RenderResult {
        Ok(Some(self.modify_column(table, column)))
    }

    fn drop_column_description(&self, table: &str, column: &Column) -> RenderResult {
        let mut bare = column.clone();
        bare.description.clear();
        Ok(Some(self.modify_column(table, &bare)))
    }

    fn drop_index(&self, table: &str, index: &Index) -> RenderResult {
        Ok(Some(format!(
            "DROP INDEX {} ON {}",
            self.format_name(&index.name_for(table)),
            self.format_name(table)
        )))
    }
}
