//! Assembling observed tables from schema-information rows.
//!
//! Drivers answer schema probes with loosely typed rows. Sessions translate
//! their driver's catalogue into [`SchemaRow`]s keyed by the canonical field
//! names below, and [`table_from_rows`] turns them into a [`Table`].
//!
//! | collection | fields |
//! |---|---|
//! | `Tables` | `TABLE_NAME`, `TABLE_TYPE`, `TABLE_OWNER`, `DESCRIPTION` |
//! | `Columns` | `COLUMN_NAME`, `ORDINAL_POSITION`, `DATA_TYPE`, `LENGTH`, `BYTE_SIZE`, `SCALE`, `IS_NULLABLE`, `IS_IDENTITY`, `IS_PRIMARY_KEY`, `COLUMN_DEFAULT`, `DESCRIPTION` |
//! | `Indexes` | `INDEX_NAME`, `COLUMN_NAME`, `IS_UNIQUE`, `IS_PRIMARY_KEY` |

use std::collections::BTreeMap;
use std::fmt;

use super::{Column, Index, Table};
use crate::dialect::{Dialect, split_raw_type};
use crate::error::ProbeError;

/// Schema collections a session can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaCollection {
    Tables,
    Columns,
    Indexes,
    DataTypes,
}

impl SchemaCollection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tables => "Tables",
            Self::Columns => "Columns",
            Self::Indexes => "Indexes",
            Self::DataTypes => "DataTypes",
        }
    }
}

impl fmt::Display for SchemaCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One schema-information row. Keys are stored upper-case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRow(BTreeMap<String, String>);

impl SchemaRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, builder style.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_ascii_uppercase(), value.into());
    }

    /// Returns the field text, or `None` when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_ascii_uppercase()).map(String::as_str)
    }

    /// Returns the field text, or `""` when absent.
    #[must_use]
    pub fn text(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    /// Parses an integer field. Absent or unparsable fields read as `0`.
    #[must_use]
    pub fn int(&self, key: &str) -> i32 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }

    /// Parses a flag field: `1`, `true`, `yes` or `y` in any case.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "y"
            )
        })
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SchemaRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (key, value) in iter {
            row.insert(key.as_ref(), value);
        }
        row
    }
}

/// Builds an observed table from its `Tables` row plus its `Columns` and
/// `Indexes` rows.
///
/// Types are mapped through `dialect`, which is also stamped on the table as
/// the origin of every raw type. Identity columns never report a default.
pub fn table_from_rows(
    dialect: &dyn Dialect,
    table_row: &SchemaRow,
    column_rows: &[SchemaRow],
    index_rows: &[SchemaRow],
) -> Result<Table, ProbeError> {
    let name = table_row
        .get("TABLE_NAME")
        .filter(|n| !n.is_empty())
        .ok_or(ProbeError::MissingField {
            collection: "Tables",
            field: "TABLE_NAME",
        })?;

    let mut table = Table::new(name).with_dialect(dialect.kind());
    table.owner = table_row.text("TABLE_OWNER").to_string();
    table.description = table_row.text("DESCRIPTION").to_string();
    table.is_view = table_row.text("TABLE_TYPE").to_ascii_uppercase().contains("VIEW");

    let mut columns = column_rows
        .iter()
        .map(|row| column_from_row(dialect, row))
        .collect::<Result<Vec<_>, _>>()?;
    // Columns without an ordinal go after the numbered ones, in row order.
    let last = columns.iter().map(|c| c.id).max().unwrap_or_default();
    let unnumbered = columns.iter_mut().filter(|c| c.id == 0);
    for (position, column) in (last.saturating_add(1)..).zip(unnumbered) {
        column.id = position;
    }
    columns.sort_by_key(|c| c.id);
    for column in columns {
        table.add_column(column);
    }

    table.indexes = indexes_from_rows(index_rows)?;
    Ok(table)
}

fn column_from_row(dialect: &dyn Dialect, row: &SchemaRow) -> Result<Column, ProbeError> {
    let name = row
        .get("COLUMN_NAME")
        .filter(|n| !n.is_empty())
        .ok_or(ProbeError::MissingField {
            collection: "Columns",
            field: "COLUMN_NAME",
        })?;
    let raw_type = row.text("DATA_TYPE").trim();

    let mut column = Column::new(name, dialect.data_kind_of(raw_type)).raw_type(raw_type);
    column.id = u32::try_from(row.int("ORDINAL_POSITION")).unwrap_or_default();
    column.identity = row.flag("IS_IDENTITY");
    column.primary_key = row.flag("IS_PRIMARY_KEY");
    column.nullable = row.flag("IS_NULLABLE") && !column.primary_key;
    column.byte_size = row.int("BYTE_SIZE");
    column.description = row.text("DESCRIPTION").to_string();

    let (length, scale) = type_arguments(raw_type);
    column.length = row
        .get("LENGTH")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(length);
    column.scale = row
        .get("SCALE")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(scale);

    if !column.identity {
        column.default = row
            .get("COLUMN_DEFAULT")
            .and_then(|d| dialect.normalize_default(d));
    }
    Ok(column)
}

/// Reads `(length, scale)` from a raw type: `(n)` or `(p,s)`. `MAX` reads
/// as `-1`, a missing argument as `0`.
fn type_arguments(raw_type: &str) -> (i32, i32) {
    let (_, args) = split_raw_type(raw_type);
    let parse = |arg: Option<&String>| match arg.map(String::as_str) {
        Some("MAX") => -1,
        Some(value) => value.parse().unwrap_or_default(),
        None => 0,
    };
    (parse(args.first()), parse(args.get(1)))
}

/// Groups `Indexes` rows (one per indexed column, in key order) by index
/// name.
fn indexes_from_rows(rows: &[SchemaRow]) -> Result<Vec<Index>, ProbeError> {
    let mut indexes: Vec<Index> = Vec::new();
    for row in rows {
        let name = row.get("INDEX_NAME").filter(|n| !n.is_empty()).ok_or(
            ProbeError::MissingField {
                collection: "Indexes",
                field: "INDEX_NAME",
            },
        )?;
        let column = row.text("COLUMN_NAME").to_string();
        match indexes.iter_mut().find(|i| i.name == name) {
            Some(index) => index.columns.push(column),
            None => {
                let mut index = Index::new([column]).named(name);
                index.unique = row.flag("IS_UNIQUE");
                index.primary_key = row.flag("IS_PRIMARY_KEY");
                indexes.push(index);
            }
        }
    }
    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::schema::DataKind;

    fn column_row(name: &str, position: &str, data_type: &str) -> SchemaRow {
        SchemaRow::new()
            .with("COLUMN_NAME", name)
            .with("ORDINAL_POSITION", position)
            .with("DATA_TYPE", data_type)
            .with("IS_NULLABLE", "YES")
    }

    #[test]
    fn builds_table_from_rows() {
        let dialect = DialectKind::SqlServer.dialect();
        let table_row = SchemaRow::new()
            .with("table_name", "Users")
            .with("TABLE_TYPE", "BASE TABLE");
        let columns = vec![
            column_row("Name", "2", "nvarchar(50)").with("COLUMN_DEFAULT", "(N'anon')"),
            column_row("Id", "1", "int")
                .with("IS_IDENTITY", "1")
                .with("IS_PRIMARY_KEY", "1")
                .with("COLUMN_DEFAULT", "((0))"),
            column_row("Bio", "3", "nvarchar(max)"),
        ];
        let indexes = vec![
            SchemaRow::new()
                .with("INDEX_NAME", "IX_Users_Name")
                .with("COLUMN_NAME", "Name")
                .with("IS_UNIQUE", "true"),
        ];

        let table = table_from_rows(dialect, &table_row, &columns, &indexes).unwrap();
        assert_eq!(table.name(), "Users");
        assert!(!table.is_view);
        assert_eq!(table.dialect(), Some(DialectKind::SqlServer));

        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Id", "Name", "Bio"]);

        let id = table.column("Id").unwrap();
        assert!(id.identity && id.primary_key && !id.nullable);
        assert_eq!(id.default, None);

        let name = table.column("Name").unwrap();
        assert_eq!(name.data_kind, DataKind::String);
        assert_eq!(name.length, 50);
        assert_eq!(name.default.as_deref(), Some("anon"));
        assert_eq!(name.origin(), Some(DialectKind::SqlServer));

        assert_eq!(table.column("Bio").unwrap().length, -1);
        assert_eq!(table.indexes.len(), 1);
        assert!(table.indexes[0].unique);
    }

    #[test]
    fn zero_ordinals_follow_discovery_order() {
        let dialect = DialectKind::Sqlite.dialect();
        let table_row = SchemaRow::new().with("TABLE_NAME", "T");
        let columns = vec![column_row("B", "0", "TEXT"), column_row("A", "0", "INT")];
        let table = table_from_rows(dialect, &table_row, &columns, &[]).unwrap();
        assert_eq!(table.columns()[0].name, "B");
        assert_eq!(table.columns()[0].id, 1);
        assert_eq!(table.columns()[1].id, 2);
    }

    #[test]
    fn unnumbered_columns_sort_after_numbered_ones() {
        let dialect = DialectKind::Sqlite.dialect();
        let table_row = SchemaRow::new().with("TABLE_NAME", "T");
        let columns = vec![
            column_row("Late", "0", "TEXT"),
            column_row("Second", "2", "INT"),
            column_row("First", "1", "INT"),
            column_row("Later", "0", "INT"),
        ];
        let table = table_from_rows(dialect, &table_row, &columns, &[]).unwrap();
        let names: Vec<_> = table.columns().iter().map(|c| (c.name.as_str(), c.id)).collect();
        assert_eq!(names, [("First", 1), ("Second", 2), ("Late", 3), ("Later", 4)]);
    }

    #[test]
    fn missing_names_are_errors() {
        let dialect = DialectKind::Sqlite.dialect();
        let err = table_from_rows(dialect, &SchemaRow::new(), &[], &[]).unwrap_err();
        assert_eq!(
            err,
            ProbeError::MissingField {
                collection: "Tables",
                field: "TABLE_NAME",
            }
        );
    }

    #[test]
    fn multi_column_indexes_are_grouped() {
        let rows = vec![
            SchemaRow::new()
                .with("INDEX_NAME", "IX_T_AB")
                .with("COLUMN_NAME", "A"),
            SchemaRow::new()
                .with("INDEX_NAME", "IX_T_AB")
                .with("COLUMN_NAME", "B"),
        ];
        let indexes = indexes_from_rows(&rows).unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].columns, ["A", "B"]);
    }
}
