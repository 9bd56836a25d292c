//! Microsoft SQL Server dialect.

use super::{
    Dialect, DialectKind, PagingStyle, RenderResult, bounded_length, decimal_args, quote_literal,
    split_raw_type,
};
use crate::schema::{Column, DataKind, Index};

/// SQL Server dialect.
///
/// The default instance targets SQL Server 2005 and later. [`legacy`]
/// targets SQL Server 2000, which lacks `ROW_NUMBER()`.
///
/// [`legacy`]: SqlServerDialect::legacy
#[derive(Debug, Clone, Copy)]
pub struct SqlServerDialect {
    window_functions: bool,
}

impl Default for SqlServerDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlServerDialect {
    /// Creates a SQL Server 2005+ dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            window_functions: true,
        }
    }

    /// Creates a SQL Server 2000 dialect.
    #[must_use]
    pub const fn legacy() -> Self {
        Self {
            window_functions: false,
        }
    }

    fn description_call(
        procedure: &str,
        table: &str,
        column: Option<&str>,
        value: Option<&str>,
    ) -> String {
        let mut sql = format!("EXEC {procedure} N'MS_Description'");
        if let Some(value) = value {
            sql.push_str(&format!(", {}", quote_literal(value)));
        }
        sql.push_str(&format!(
            ", N'SCHEMA', N'dbo', N'TABLE', {}",
            quote_literal(table)
        ));
        if let Some(column) = column {
            sql.push_str(&format!(", N'COLUMN', {}", quote_literal(column)));
        }
        sql
    }
}

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        if self.window_functions {
            "sqlserver"
        } else {
            "sqlserver2000"
        }
    }

    fn kind(&self) -> DialectKind {
        DialectKind::SqlServer
    }

    fn paging(&self) -> PagingStyle {
        PagingStyle::Top
    }

    fn supports_window_functions(&self) -> bool {
        self.window_functions
    }

    fn now_literal(&self) -> &'static str {
        "getdate()"
    }

    fn quote_chars(&self) -> (char, char) {
        ('[', ']')
    }

    fn supports_descriptions(&self) -> bool {
        true
    }

    fn type_name(&self, column: &Column) -> String {
        let threshold = self.long_text_threshold();
        let base = match column.data_kind {
            DataKind::Boolean => "BIT".to_string(),
            DataKind::Byte => "TINYINT".to_string(),
            DataKind::Int16 => "SMALLINT".to_string(),
            DataKind::Int32 => "INT".to_string(),
            DataKind::Int64 => "BIGINT".to_string(),
            DataKind::Single => "REAL".to_string(),
            DataKind::Double => "FLOAT".to_string(),
            DataKind::Decimal => {
                let (precision, scale) = decimal_args(column);
                format!("DECIMAL({precision},{scale})")
            }
            DataKind::DateTime => "DATETIME".to_string(),
            DataKind::Guid => "UNIQUEIDENTIFIER".to_string(),
            DataKind::String => match bounded_length(column, threshold) {
                Some(n) => format!("NVARCHAR({n})"),
                None => "NVARCHAR(MAX)".to_string(),
            },
            DataKind::Binary => match bounded_length(column, 8000) {
                Some(n) => format!("VARBINARY({n})"),
                None => "VARBINARY(MAX)".to_string(),
            },
        };
        if column.identity {
            format!("{base} IDENTITY(1,1)")
        } else {
            base
        }
    }

    fn data_kind_of(&self, raw_type: &str) -> DataKind {
        let (base, _) = split_raw_type(raw_type);
        match base.as_str() {
            "BIT" => DataKind::Boolean,
            "TINYINT" => DataKind::Byte,
            "SMALLINT" => DataKind::Int16,
            "INT" => DataKind::Int32,
            "BIGINT" => DataKind::Int64,
            "REAL" => DataKind::Single,
            "FLOAT" => DataKind::Double,
            "DECIMAL" | "NUMERIC" | "MONEY" | "SMALLMONEY" => DataKind::Decimal,
            "DATETIME" | "DATETIME2" | "SMALLDATETIME" | "DATE" | "DATETIMEOFFSET" => {
                DataKind::DateTime
            }
            "UNIQUEIDENTIFIER" => DataKind::Guid,
            "BINARY" | "VARBINARY" | "IMAGE" | "TIMESTAMP" | "ROWVERSION" => DataKind::Binary,
            _ => DataKind::String,
        }
    }

    fn create_database(&self, name: &str, path: Option<&str>) -> RenderResult {
        let mut sql = format!("CREATE DATABASE {}", self.format_name(name));
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            sql.push_str(&format!(
                " ON (NAME = {}, FILENAME = {})",
                quote_literal(name),
                quote_literal(path)
            ));
        }
        Ok(Some(sql))
    }

    fn drop_database(&self, name: &str) -> RenderResult {
        Ok(Some(format!("DROP DATABASE {}", self.format_name(name))))
    }

    fn database_exists(&self, name: &str) -> RenderResult {
        Ok(Some(format!(
            "SELECT 1 FROM master.dbo.sysdatabases WHERE name = {}",
            quote_literal(name)
        )))
    }

    fn add_table_description(&self, table: &str, description: &str) -> RenderResult {
        Ok(Some(Self::description_call(
            "sp_addextendedproperty",
            table,
            None,
            Some(description),
        )))
    }

    fn drop_table_description(&self, table: &str) -> RenderResult {
        Ok(Some(Self::description_call(
            "sp_dropextendedproperty",
            table,
            None,
            None,
        )))
    }

    fn add_column(&self, table: &str, column: &Column) -> RenderResult {
        Ok(Some(format!(
            "ALTER TABLE {} ADD {}",
            self.format_name(table),
            self.field_clause(column, true)
        )))
    }

    fn add_column_description(&self, table: &str, column: &Column) -> RenderResult {
        Ok(Some(Self::description_call(
            "sp_addextendedproperty",
            table,
            Some(&column.name),
            Some(&column.description),
        )))
    }

    fn drop_column_description(&self, table: &str, column: &Column) -> RenderResult {
        Ok(Some(Self::description_call(
            "sp_dropextendedproperty",
            table,
            Some(&column.name),
            None,
        )))
    }

    fn add_default(&self, table: &str, column: &Column) -> RenderResult {
        let Some(literal) = self.default_literal(column) else {
            return Ok(Some(String::new()));
        };
        Ok(Some(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {literal} FOR {}",
            self.format_name(table),
            self.format_name(&format!("DF_{table}_{}", column.name)),
            self.format_name(&column.name)
        )))
    }

    /// Default constraints may carry generated names, so the constraint is
    /// looked up in the catalogue and dropped with dynamic SQL. The script
    /// is one batch and must not be split.
    fn drop_default(&self, table: &str, column: &Column) -> RenderResult {
        let script = [
            "DECLARE @name NVARCHAR(256)".to_string(),
            format!(
                "SELECT @name = d.name FROM sysobjects d JOIN syscolumns c ON d.id = c.cdefault \
                 WHERE d.xtype = 'D' AND c.id = OBJECT_ID({}) AND c.name = {}",
                quote_literal(table),
                quote_literal(&column.name)
            ),
            format!(
                "IF @name IS NOT NULL EXEC('ALTER TABLE {} DROP CONSTRAINT [' + @name + ']')",
                self.format_name(table).replace('\'', "''")
            ),
        ];
        Ok(Some(script.join("\n")))
    }

    fn drop_index(&self, table: &str, index: &Index) -> RenderResult {
        Ok(Some(format!(
            "DROP INDEX {}.{}",
            self.format_name(table),
            self.format_name(&index.name_for(table))
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::SchemaOp;

    fn render(op: &SchemaOp) -> String {
        SqlServerDialect::new().render(op).unwrap().unwrap()
    }

    #[test]
    fn type_names() {
        let d = SqlServerDialect::new();
        assert_eq!(d.type_name(&Column::new("a", DataKind::String).length(50)), "NVARCHAR(50)");
        assert_eq!(d.type_name(&Column::new("a", DataKind::String)), "NVARCHAR(MAX)");
        assert_eq!(d.type_name(&Column::new("a", DataKind::String).length(5000)), "NVARCHAR(MAX)");
        assert_eq!(
            d.type_name(&Column::new("a", DataKind::Int32).identity()),
            "INT IDENTITY(1,1)"
        );
        assert_eq!(d.data_kind_of("nvarchar(max)"), DataKind::String);
        assert_eq!(d.data_kind_of("datetime2(7)"), DataKind::DateTime);
    }

    #[test]
    fn add_default_uses_named_constraint() {
        let column = Column::new("Created", DataKind::DateTime).default_value("now()");
        assert_eq!(
            render(&SchemaOp::AddDefault {
                table: "Users".into(),
                column,
            }),
            "ALTER TABLE Users ADD CONSTRAINT DF_Users_Created DEFAULT getdate() FOR Created"
        );
    }

    #[test]
    fn drop_default_is_one_batch() {
        let sql = render(&SchemaOp::DropDefault {
            table: "Users".into(),
            column: Column::new("Created", DataKind::DateTime),
        });
        assert!(sql.starts_with("DECLARE @name"));
        assert!(!sql.contains(";\n"));
        assert!(sql.contains("OBJECT_ID('Users')"));
    }

    #[test]
    fn descriptions_use_extended_properties() {
        let sql = render(&SchemaOp::AddTableDescription {
            table: "Users".into(),
            description: "People's accounts".into(),
        });
        assert_eq!(
            sql,
            "EXEC sp_addextendedproperty N'MS_Description', 'People''s accounts', \
             N'SCHEMA', N'dbo', N'TABLE', 'Users'"
        );

        let sql = render(&SchemaOp::DropColumnDescription {
            table: "Users".into(),
            column: Column::new("Name", DataKind::String),
        });
        assert_eq!(
            sql,
            "EXEC sp_dropextendedproperty N'MS_Description', N'SCHEMA', N'dbo', \
             N'TABLE', 'Users', N'COLUMN', 'Name'"
        );
    }

    #[test]
    fn drop_index_is_table_qualified() {
        let sql = render(&SchemaOp::DropIndex {
            table: "Users".into(),
            index: Index::new(["Email"]),
        });
        assert_eq!(sql, "DROP INDEX Users.IX_Users_Email");
    }

    #[test]
    fn add_column_omits_column_keyword() {
        let sql = render(&SchemaOp::AddColumn {
            table: "Users".into(),
            column: Column::new("Email", DataKind::String).length(100),
        });
        assert_eq!(sql, "ALTER TABLE Users ADD Email NVARCHAR(100) NULL");
    }
}
