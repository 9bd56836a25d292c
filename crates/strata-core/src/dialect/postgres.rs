//! PostgreSQL dialect.

use super::{
    Dialect, DialectKind, PagingStyle, RenderResult, STATEMENT_SEPARATOR, bounded_length,
    decimal_args, quote_literal, split_raw_type, strip_parens,
};
use crate::schema::{Column, DataKind};

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn comment_on(target: &str, text: Option<&str>) -> String {
        format!(
            "COMMENT ON {target} IS {}",
            text.map_or_else(|| "NULL".to_string(), quote_literal)
        )
    }

    fn column_target(&self, table: &str, column: &str) -> String {
        format!(
            "COLUMN {}.{}",
            self.format_name(table),
            self.format_name(column)
        )
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn paging(&self) -> PagingStyle {
        PagingStyle::LimitOffset
    }

    fn now_literal(&self) -> &'static str {
        "now()"
    }

    fn supports_descriptions(&self) -> bool {
        true
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }

    fn type_name(&self, column: &Column) -> String {
        if column.identity {
            return if column.data_kind == DataKind::Int64 {
                "BIGSERIAL".to_string()
            } else {
                "SERIAL".to_string()
            };
        }
        match column.data_kind {
            DataKind::Boolean => "BOOLEAN".to_string(),
            DataKind::Byte | DataKind::Int16 => "SMALLINT".to_string(),
            DataKind::Int32 => "INTEGER".to_string(),
            DataKind::Int64 => "BIGINT".to_string(),
            DataKind::Single => "REAL".to_string(),
            DataKind::Double => "DOUBLE PRECISION".to_string(),
            DataKind::Decimal => {
                let (precision, scale) = decimal_args(column);
                format!("NUMERIC({precision},{scale})")
            }
            DataKind::DateTime => "TIMESTAMP".to_string(),
            DataKind::Guid => "UUID".to_string(),
            DataKind::String => match bounded_length(column, self.long_text_threshold()) {
                Some(n) => format!("VARCHAR({n})"),
                None => "TEXT".to_string(),
            },
            DataKind::Binary => "BYTEA".to_string(),
        }
    }

    fn data_kind_of(&self, raw_type: &str) -> DataKind {
        let (base, _) = split_raw_type(raw_type);
        match base.as_str() {
            "BOOLEAN" | "BOOL" => DataKind::Boolean,
            "SMALLINT" | "INT2" | "SMALLSERIAL" => DataKind::Int16,
            "INTEGER" | "INT" | "INT4" | "SERIAL" => DataKind::Int32,
            "BIGINT" | "INT8" | "BIGSERIAL" => DataKind::Int64,
            "REAL" | "FLOAT4" => DataKind::Single,
            "DOUBLE PRECISION" | "FLOAT8" | "FLOAT" => DataKind::Double,
            "NUMERIC" | "DECIMAL" | "MONEY" => DataKind::Decimal,
            b if b.starts_with("TIMESTAMP") || b == "DATE" => DataKind::DateTime,
            "UUID" => DataKind::Guid,
            "BYTEA" => DataKind::Binary,
            _ => DataKind::String,
        }
    }

    /// There is no one-byte integer, so `Byte` is stored as `SMALLINT`.
    fn kinds_equivalent(&self, a: DataKind, b: DataKind) -> bool {
        let widen = |k: DataKind| if k == DataKind::Byte { DataKind::Int16 } else { k };
        widen(a) == widen(b)
    }

    /// Also strips `::type` casts: `'x'::character varying` becomes `x`.
    fn normalize_default(&self, raw: &str) -> Option<String> {
        let mut text = strip_parens(raw);
        if let Some(cast) = find_cast(text) {
            text = strip_parens(&text[..cast]);
        }
        if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
            let inner = text[1..text.len() - 1].replace("''", "'");
            let inner = inner.trim();
            return (!inner.is_empty()).then(|| inner.to_string());
        }
        if text.is_empty() || text.eq_ignore_ascii_case("null") {
            None
        } else {
            Some(text.to_string())
        }
    }

    fn limit_clause(&self, offset: u64, max_rows: u64) -> String {
        match (offset, max_rows) {
            (0, max) => format!("LIMIT {max}"),
            (off, 0) => format!("OFFSET {off}"),
            (off, max) => format!("LIMIT {max} OFFSET {off}"),
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
            "SELECT 1 FROM pg_database WHERE datname = {}",
            quote_literal(name)
        )))
    }

    fn table_exists(&self, name: &str) -> RenderResult {
        Ok(Some(format!(
            "SELECT 1 FROM information_schema.tables WHERE table_schema = current_schema() \
             AND table_name = {}",
            quote_literal(name)
        )))
    }

    fn add_table_description(&self, table: &str, description: &str) -> RenderResult {
        let target = format!("TABLE {}", self.format_name(table));
        Ok(Some(Self::comment_on(&target, Some(description))))
    }

    fn drop_table_description(&self, table: &str) -> RenderResult {
        let target = format!("TABLE {}", self.format_name(table));
        Ok(Some(Self::comment_on(&target, None)))
    }

    fn add_column_description(&self, table: &str, column: &Column) -> RenderResult {
        let target = self.column_target(table, &column.name);
        Ok(Some(Self::comment_on(&target, Some(&column.description))))
    }

    fn drop_column_description(&self, table: &str, column: &Column) -> RenderResult {
        let target = self.column_target(table, &column.name);
        Ok(Some(Self::comment_on(&target, None)))
    }

    /// Emits a type change and a nullability change as two statements.
    fn alter_column(&self, table: &str, column: &Column, _previous: &Column) -> RenderResult {
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.format_name(table),
            self.format_name(&column.name)
        );
        let data_type = match self.type_name(column).as_str() {
            "BIGSERIAL" => "BIGINT".to_string(),
            "SERIAL" => "INTEGER".to_string(),
            _ => self.column_type(column),
        };
        let nullability = if column.nullable && !column.primary_key && !column.identity {
            "DROP NOT NULL"
        } else {
            "SET NOT NULL"
        };
        Ok(Some(
            [
                format!("{prefix} TYPE {data_type}"),
                format!("{prefix} {nullability}"),
            ]
            .join(STATEMENT_SEPARATOR),
        ))
    }
}

/// Byte offset of a top-level `::` cast outside quotes.
fn find_cast(text: &str) -> Option<usize> {
    let mut in_quote = false;
    let bytes = text.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        match *byte {
            b'\'' => in_quote = !in_quote,
            b':' if !in_quote && bytes.get(i + 1) == Some(&b':') => return Some(i),
            _ => {}
        }
    }
    None
}
