//! SQL dialects.
//!
//! A [`Dialect`] carries both the capability data the pagination strategist
//! and the schema differ consult (paging style, window functions, long-text
//! threshold, the "now" literal, identifier quoting) and the DDL renderers
//! for every [`SchemaOp`]. Renderers have ANSI-flavoured defaults that each
//! dialect overrides where its syntax differs.

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ddl::{SchemaOp, SchemaOpKind};
use crate::error::DdlError;
use crate::schema::{Column, DataKind, Index, Table};

/// Result of rendering one operation.
///
/// `Ok(None)` means the dialect performs the operation outside SQL.
/// `Ok(Some(String::new()))` means another statement already covers it.
pub type RenderResult = Result<Option<String>, DdlError>;

/// Separator between statements of a multi-statement script.
pub const STATEMENT_SEPARATOR: &str = ";\n";

/// Every spelling of "current date and time" the dialects use.
const NOW_LITERALS: [&str; 8] = [
    "getdate()",
    "getutcdate()",
    "sysdatetime()",
    "current_timestamp",
    "current_timestamp()",
    "now()",
    "localtimestamp",
    "datetime('now')",
];

/// Words that must be quoted when used as names.
const RESERVED_WORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "DATABASE", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP",
    "ELSE", "END", "EXCEPT", "EXISTS", "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IDENTITY",
    "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE",
    "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES",
    "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO", "TOP", "TRANSACTION", "UNION", "UNIQUE",
    "UPDATE", "USER", "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
];

/// How a dialect limits the rows of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStyle {
    /// `SELECT TOP n …`; offsets need one of the rewrite strategies.
    Top,
    /// Native `LIMIT`/`OFFSET`.
    LimitOffset,
}

/// Serializable tag naming a built-in dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    SqlServer,
    Sqlite,
    Postgres,
    MySql,
}

static SQL_SERVER: SqlServerDialect = SqlServerDialect::new();
static SQL_SERVER_LEGACY: SqlServerDialect = SqlServerDialect::legacy();
static SQLITE: SqliteDialect = SqliteDialect::new();
static POSTGRES: PostgresDialect = PostgresDialect::new();
static MYSQL: MySqlDialect = MySqlDialect::new();

impl DialectKind {
    /// Returns the canonical tag name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SqlServer => "sqlserver",
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
        }
    }

    /// Returns the shared dialect instance for this tag.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::SqlServer => &SQL_SERVER,
            Self::Sqlite => &SQLITE,
            Self::Postgres => &POSTGRES,
            Self::MySql => &MYSQL,
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dialect `{0}`")]
pub struct UnknownDialect(pub String);

impl FromStr for DialectKind {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        dialect_by_name(s)
            .map(Dialect::kind)
            .ok_or_else(|| UnknownDialect(s.trim().to_string()))
    }
}

impl Serialize for DialectKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DialectKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Looks up a built-in dialect by name.
///
/// `sqlserver2000` selects the SQL Server variant without window functions.
#[must_use]
pub fn dialect_by_name(name: &str) -> Option<&'static dyn Dialect> {
    match name.trim().to_ascii_lowercase().as_str() {
        "sqlserver" | "mssql" | "sqlserver2005" => Some(&SQL_SERVER),
        "sqlserver2000" | "mssql2000" => Some(&SQL_SERVER_LEGACY),
        "sqlite" | "sqlite3" => Some(&SQLITE),
        "postgres" | "postgresql" | "pg" => Some(&POSTGRES),
        "mysql" | "mariadb" => Some(&MYSQL),
        _ => None,
    }
}

/// Returns `true` if `text` is any dialect's spelling of "now".
#[must_use]
pub fn is_now_literal(text: &str) -> bool {
    let compact = compact_lower(strip_parens(text));
    NOW_LITERALS.iter().any(|now| compact == compact_lower(now))
}

fn compact_lower(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Removes fully wrapping parentheses: `((0))` becomes `0`.
#[must_use]
pub fn strip_parens(text: &str) -> &str {
    let mut text = text.trim();
    while text.starts_with('(') && text.ends_with(')') && wraps_whole(text) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

fn wraps_whole(text: &str) -> bool {
    let mut depth = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i + 1 < text.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Quotes `text` as a string literal, doubling embedded quotes.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Splits a raw type such as `NVARCHAR(50)` into its upper-cased base name
/// and argument list.
pub(crate) fn split_raw_type(raw: &str) -> (String, Vec<String>) {
    let raw = raw.trim();
    match raw.find('(') {
        Some(open) => {
            let base = raw[..open].trim().to_ascii_uppercase();
            let close = raw.rfind(')').filter(|c| *c > open).unwrap_or(raw.len());
            let args = raw[open + 1..close]
                .split(',')
                .map(|a| a.trim().to_ascii_uppercase())
                .filter(|a| !a.is_empty())
                .collect();
            (base, args)
        }
        None => (raw.to_ascii_uppercase(), Vec::new()),
    }
}

/// Canonical boolean text for default comparison: `"1"`, `"0"` or `None`.
#[must_use]
pub fn boolean_text(text: &str) -> Option<&'static str> {
    match strip_parens(text).trim_matches('\'').to_ascii_lowercase().as_str() {
        "1" | "true" | "b'1'" | "t" | "yes" => Some("1"),
        "0" | "false" | "b'0'" | "f" | "no" => Some("0"),
        _ => None,
    }
}

/// A database product's SQL conventions.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the tag stamped on tables and columns this dialect produces.
    fn kind(&self) -> DialectKind;

    fn paging(&self) -> PagingStyle;

    /// `ROW_NUMBER() OVER (…)` is available.
    fn supports_window_functions(&self) -> bool {
        false
    }

    /// String lengths above this are large objects.
    fn long_text_threshold(&self) -> i32 {
        4000
    }

    /// The expression for the current date and time.
    fn now_literal(&self) -> &'static str;

    /// Opening and closing identifier quotes.
    fn quote_chars(&self) -> (char, char) {
        ('"', '"')
    }

    fn is_reserved(&self, word: &str) -> bool {
        RESERVED_WORDS.iter().any(|r| r.eq_ignore_ascii_case(word))
    }

    /// Table and column descriptions can be stored.
    fn supports_descriptions(&self) -> bool {
        false
    }

    /// Formats a name, quoting it only when it is reserved or not a plain
    /// identifier.
    fn format_name(&self, name: &str) -> String {
        let (open, close) = self.quote_chars();
        let name = name.trim();
        if name.starts_with(open) && name.ends_with(close) && name.len() > 1 {
            return name.to_string();
        }
        let plain = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain && !self.is_reserved(name) {
            name.to_string()
        } else {
            let escaped = name.replace(close, &format!("{close}{close}"));
            format!("{open}{escaped}{close}")
        }
    }

    /// Maps a column's semantic type to a native type name.
    fn type_name(&self, column: &Column) -> String;

    /// Maps a native type name back to a semantic type.
    fn data_kind_of(&self, raw_type: &str) -> DataKind;

    /// Whether two kinds are stored identically by this dialect.
    fn kinds_equivalent(&self, a: DataKind, b: DataKind) -> bool {
        a == b
    }

    /// Strips driver decoration from a reported default value.
    fn normalize_default(&self, raw: &str) -> Option<String> {
        let mut text = strip_parens(raw);
        if let Some(inner) = text.strip_prefix('N').filter(|t| t.starts_with('\'')) {
            text = inner;
        }
        let text = if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
            text[1..text.len() - 1].replace("''", "'")
        } else {
            text.to_string()
        };
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("null") {
            None
        } else {
            Some(text.to_string())
        }
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    /// Renders the native limit clause. `max_rows == 0` means no upper bound.
    fn limit_clause(&self, offset: u64, max_rows: u64) -> String {
        match (offset, max_rows) {
            (0, max) => format!("FETCH FIRST {max} ROWS ONLY"),
            (off, 0) => format!("OFFSET {off} ROWS"),
            (off, max) => format!("OFFSET {off} ROWS FETCH NEXT {max} ROWS ONLY"),
        }
    }

    /// Returns the type to render for `column`: its raw type when this
    /// dialect produced it, otherwise [`Dialect::type_name`].
    fn column_type(&self, column: &Column) -> String {
        let raw = column.raw_type.trim();
        let reusable = column.origin() == Some(self.kind())
            && !raw.is_empty()
            && (raw.contains('(')
                || !matches!(
                    column.data_kind,
                    DataKind::String | DataKind::Binary | DataKind::Decimal
                ));
        if reusable && !column.identity {
            raw.to_string()
        } else {
            self.type_name(column)
        }
    }

    /// Keyword appended after the nullability of an identity column.
    fn identity_suffix(&self, _column: &Column, _standalone: bool) -> &'static str {
        ""
    }

    /// Renders a column definition. `standalone` is `true` inside
    /// `CREATE TABLE` and `ADD COLUMN`, `false` inside an alter.
    fn field_clause(&self, column: &Column, standalone: bool) -> String {
        base_field_clause(self, column, standalone)
    }

    /// Renders the default value of `column` as a literal.
    fn default_literal(&self, column: &Column) -> Option<String> {
        let text = column.default_text()?;
        let literal = match column.data_kind {
            DataKind::DateTime if is_now_literal(text) => self.now_literal().to_string(),
            DataKind::Boolean => match boolean_text(text) {
                Some(b) => self.boolean_literal(b == "1").to_string(),
                None => text.to_string(),
            },
            DataKind::String | DataKind::Guid | DataKind::DateTime => {
                let unquoted = self.normalize_default(text).unwrap_or_default();
                quote_literal(&unquoted)
            }
            _ => strip_parens(text).to_string(),
        };
        Some(literal)
    }

    /// Renders `op`.
    fn render(&self, op: &SchemaOp) -> RenderResult {
        match op {
            SchemaOp::CreateDatabase { name, path } => self.create_database(name, path.as_deref()),
            SchemaOp::DropDatabase { name } => self.drop_database(name),
            SchemaOp::DatabaseExists { name } => self.database_exists(name),
            SchemaOp::CreateTable { table } => self.create_table(table),
            SchemaOp::DropTable { name } => self.drop_table(name),
            SchemaOp::TableExists { name } => self.table_exists(name),
            SchemaOp::AddTableDescription { table, description } => {
                self.add_table_description(table, description)
            }
            SchemaOp::DropTableDescription { table } => self.drop_table_description(table),
            SchemaOp::AddColumn { table, column } => self.add_column(table, column),
            SchemaOp::AlterColumn {
                table,
                column,
                previous,
            } => self.alter_column(table, column, previous),
            SchemaOp::DropColumn { table, column } => self.drop_column(table, column),
            SchemaOp::AddColumnDescription { table, column } => {
                self.add_column_description(table, column)
            }
            SchemaOp::DropColumnDescription { table, column } => {
                self.drop_column_description(table, column)
            }
            SchemaOp::AddDefault { table, column } => self.add_default(table, column),
            SchemaOp::DropDefault { table, column } => self.drop_default(table, column),
            SchemaOp::CreateIndex { table, index } => self.create_index(table, index),
            SchemaOp::DropIndex { table, index } => self.drop_index(table, index),
        }
    }

    fn create_database(&self, _name: &str, _path: Option<&str>) -> RenderResult {
        Err(self.unsupported(SchemaOpKind::CreateDatabase))
    }

    fn drop_database(&self, _name: &str) -> RenderResult {
        Err(self.unsupported(SchemaOpKind::DropDatabase))
    }

    /// A query that returns at least one row when the database exists.
    fn database_exists(&self, _name: &str) -> RenderResult {
        Err(self.unsupported(SchemaOpKind::DatabaseExists))
    }

    fn create_table(&self, table: &Table) -> RenderResult {
        let pk: Vec<&Column> = table.columns().iter().filter(|c| c.primary_key).collect();
        let composite = pk.len() > 1;

        let mut lines: Vec<String> = table
            .columns()
            .iter()
            .map(|column| {
                if composite && column.primary_key {
                    let mut member = column.clone();
                    member.primary_key = false;
                    member.nullable = false;
                    self.field_clause(&member, true)
                } else {
                    self.field_clause(column, true)
                }
            })
            .collect();

        if composite {
            let names: Vec<String> = pk.iter().map(|c| self.format_name(&c.name)).collect();
            lines.push(format!("PRIMARY KEY ({})", names.join(", ")));
        }
        for fk in &table.foreign_keys {
            lines.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                self.format_name(&fk.column),
                self.format_name(&fk.ref_table),
                self.format_name(&fk.ref_column)
            ));
        }

        Ok(Some(format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.format_name(table.name()),
            lines.join(",\n    ")
        )))
    }

    fn drop_table(&self, name: &str) -> RenderResult {
        Ok(Some(format!("DROP TABLE {}", self.format_name(name))))
    }

    /// A query that returns at least one row when the table exists.
    fn table_exists(&self, name: &str) -> RenderResult {
        Ok(Some(format!(
            "SELECT 1 FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = {}",
            quote_literal(name)
        )))
    }

    fn add_table_description(&self, _table: &str, _description: &str) -> RenderResult {
        Ok(None)
    }

    fn drop_table_description(&self, _table: &str) -> RenderResult {
        Ok(None)
    }

    fn add_column(&self, table: &str, column: &Column) -> RenderResult {
        Ok(Some(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.format_name(table),
            self.field_clause(column, true)
        )))
    }

    fn alter_column(&self, table: &str, column: &Column, _previous: &Column) -> RenderResult {
        Ok(Some(format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.format_name(table),
            self.field_clause(column, false)
        )))
    }

    fn drop_column(&self, table: &str, column: &str) -> RenderResult {
        Ok(Some(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.format_name(table),
            self.format_name(column)
        )))
    }

    fn add_column_description(&self, _table: &str, _column: &Column) -> RenderResult {
        Ok(None)
    }

    fn drop_column_description(&self, _table: &str, _column: &Column) -> RenderResult {
        Ok(None)
    }

    fn add_default(&self, table: &str, column: &Column) -> RenderResult {
        let Some(literal) = self.default_literal(column) else {
            return Ok(Some(String::new()));
        };
        Ok(Some(format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {literal}",
            self.format_name(table),
            self.format_name(&column.name)
        )))
    }

    fn drop_default(&self, table: &str, column: &Column) -> RenderResult {
        Ok(Some(format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
            self.format_name(table),
            self.format_name(&column.name)
        )))
    }

    fn create_index(&self, table: &str, index: &Index) -> RenderResult {
        let columns: Vec<String> = index.columns.iter().map(|c| self.format_name(c)).collect();
        Ok(Some(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.format_name(&index.name_for(table)),
            self.format_name(table),
            columns.join(", ")
        )))
    }

    fn drop_index(&self, table: &str, index: &Index) -> RenderResult {
        Ok(Some(format!(
            "DROP INDEX {}",
            self.format_name(&index.name_for(table))
        )))
    }

    /// Builds the error for an operation this dialect cannot express.
    fn unsupported(&self, operation: SchemaOpKind) -> DdlError {
        DdlError::Unsupported {
            dialect: self.name(),
            operation,
        }
    }
}

/// The default column definition: name, type, `PRIMARY KEY` or
/// nullability, identity keyword, then `DEFAULT` for standalone definitions.
pub(crate) fn base_field_clause<D: Dialect + ?Sized>(
    dialect: &D,
    column: &Column,
    standalone: bool,
) -> String {
    let mut sql = format!(
        "{} {}",
        dialect.format_name(&column.name),
        dialect.column_type(column)
    );

    if standalone && column.primary_key {
        sql.push_str(" PRIMARY KEY");
    } else if column.nullable && !column.primary_key {
        sql.push_str(" NULL");
    } else {
        sql.push_str(" NOT NULL");
    }
    if column.identity {
        sql.push_str(dialect.identity_suffix(column, standalone));
    }

    if standalone && !column.identity {
        if let Some(literal) = dialect.default_literal(column) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&literal);
        }
    }
    sql
}

/// Returns the length argument for a string or binary type, or `None`
/// when the column is unbounded under `threshold`.
pub(crate) fn bounded_length(column: &Column, threshold: i32) -> Option<i32> {
    (column.length > 0 && column.length <= threshold).then_some(column.length)
}

/// Returns `(precision, scale)` for a decimal column.
pub(crate) fn decimal_args(column: &Column) -> (i32, i32) {
    if column.length > 0 {
        (column.length, column.scale.max(0))
    } else {
        (18, 0)
    }
}
