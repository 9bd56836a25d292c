//! Integration tests for the schema diff engine.
//!
//! Declared tables are diffed against observed snapshots and the resulting
//! operations are rendered through the target dialect.

mod common;
use common::*;

use pretty_assertions::assert_eq;
use strata_core::schema::probe::{SchemaRow, table_from_rows};
use strata_core::schema::{Column, DataKind, Index, Table};
use strata_core::{DialectKind, SchemaOp, SchemaOpKind, diff_schema, diff_table};

fn kinds(operations: &[SchemaOp]) -> Vec<SchemaOpKind> {
    operations.iter().map(SchemaOp::kind).collect()
}

fn script(operations: &[SchemaOp], dialect: &str) -> Vec<String> {
    let d = common::dialect(dialect);
    operations
        .iter()
        .filter_map(|op| d.render(op).unwrap())
        .filter(|sql| !sql.is_empty())
        .collect()
}

// =============================================================================
// Worked examples
// =============================================================================

#[test]
fn adding_a_nullable_column() {
    let observed = users();
    let declared = users().with_column(Column::new("Email", DataKind::String).length(100));

    let diff = diff_table(&declared, Some(&observed), dialect("sqlserver"));
    assert_eq!(kinds(&diff.operations), [SchemaOpKind::AddColumn]);
    assert_eq!(
        script(&diff.operations, "sqlserver"),
        ["ALTER TABLE Users ADD Email NVARCHAR(100) NULL"]
    );
}

#[test]
fn now_defaults_do_not_churn_across_dialects() {
    let declared = users().with_dialect(DialectKind::SqlServer);
    let mut observed = users().with_dialect(DialectKind::Sqlite);
    observed
        .column_mut("Created")
        .unwrap()
        .default = Some("CURRENT_TIMESTAMP".to_string());

    let diff = diff_table(&declared, Some(&observed), dialect("sqlite"));
    assert!(diff.is_empty(), "{:?}", diff.operations);
}

// =============================================================================
// Whole tables
// =============================================================================

#[test]
fn missing_table_renders_create_and_indexes() {
    let declared = users().with_index(Index::new(["Name"]).unique());
    let diff = diff_table(&declared, None, dialect("sqlite"));
    assert_eq!(
        script(&diff.operations, "sqlite"),
        [
            "CREATE TABLE Users (\n    Id INTEGER PRIMARY KEY AUTOINCREMENT,\n    Name NVARCHAR(50) NOT NULL,\n    Created DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP\n)",
            "CREATE UNIQUE INDEX IX_Users_Name ON Users (Name)",
        ]
    );
}

#[test]
fn diff_schema_skips_converged_tables() {
    let declared = vec![
        users(),
        Table::new("Orders").with_column(Column::new("Id", DataKind::Int64).primary_key()),
    ];
    let observed = vec![users(), Table::new("Audit")];
    let diffs = diff_schema(&declared, &observed, dialect("sqlserver"));
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].table, "Orders");
    assert_eq!(kinds(&diffs[0].operations), [SchemaOpKind::CreateTable]);
}

// =============================================================================
// Columns
// =============================================================================

#[test]
fn column_changes_in_execution_order() {
    let mut declared = users();
    declared.column_mut("Name").unwrap().length = 80;
    declared.add_column(Column::new("Email", DataKind::String).length(100));

    let observed = users().with_column(Column::new("Fax", DataKind::String).length(20));

    let diff = diff_table(&declared, Some(&observed), dialect("sqlserver"));
    assert_eq!(
        kinds(&diff.operations),
        [
            SchemaOpKind::AlterColumn,
            SchemaOpKind::AddColumn,
            SchemaOpKind::DropColumn
        ]
    );
    assert_eq!(
        script(&diff.operations, "sqlserver"),
        [
            "ALTER TABLE Users ALTER COLUMN Name NVARCHAR(80) NOT NULL",
            "ALTER TABLE Users ADD Email NVARCHAR(100) NULL",
            "ALTER TABLE Users DROP COLUMN Fax",
        ]
    );
}

#[test]
fn long_text_lengths_never_alter() {
    let d = dialect("sqlserver");
    let over = d.long_text_threshold() + 1;
    for declared_length in [0, over] {
        for observed_length in [0, over] {
            let declared = Table::new("Notes")
                .with_column(Column::new("Body", DataKind::String).length(declared_length));
            let observed = Table::new("Notes")
                .with_column(Column::new("Body", DataKind::String).length(observed_length));
            assert!(
                diff_table(&declared, Some(&observed), d).is_empty(),
                "{declared_length} vs {observed_length}"
            );
        }
    }
}

#[test]
fn changed_default_drops_then_adds() {
    let declared = Table::new("Stock")
        .with_column(Column::new("Qty", DataKind::Int32).not_null().default_value("1"));
    let observed = Table::new("Stock")
        .with_column(Column::new("Qty", DataKind::Int32).not_null().default_value("0"));
    let diff = diff_table(&declared, Some(&observed), dialect("postgres"));
    assert_eq!(
        script(&diff.operations, "postgres"),
        [
            "ALTER TABLE Stock ALTER COLUMN Qty DROP DEFAULT",
            "ALTER TABLE Stock ALTER COLUMN Qty SET DEFAULT 1",
        ]
    );
}

// =============================================================================
// Probed snapshots
// =============================================================================

#[test]
fn probed_sqlite_snapshot_is_converged() {
    let d = dialect("sqlite");
    let table_row = SchemaRow::new().with("TABLE_NAME", "users");
    let columns = [
        ("Id", "1", "INTEGER", "0", "1", "1", ""),
        ("Name", "2", "NVARCHAR(50)", "0", "0", "0", ""),
        ("Created", "3", "DATETIME", "0", "0", "0", "CURRENT_TIMESTAMP"),
    ]
    .into_iter()
    .map(|(name, position, data_type, nullable, identity, pk, default)| {
        SchemaRow::new()
            .with("COLUMN_NAME", name)
            .with("ORDINAL_POSITION", position)
            .with("DATA_TYPE", data_type)
            .with("IS_NULLABLE", nullable)
            .with("IS_IDENTITY", identity)
            .with("IS_PRIMARY_KEY", pk)
            .with("COLUMN_DEFAULT", default)
    })
    .collect::<Vec<_>>();
    let observed = table_from_rows(d, &table_row, &columns, &[]).unwrap();

    let declared = users().with_dialect(DialectKind::SqlServer);
    let diff = diff_table(&declared, Some(&observed), d);
    assert!(diff.is_empty(), "{:?}", diff.operations);
}
