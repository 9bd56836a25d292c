#![allow(dead_code)]

use strata_core::schema::{Column, DataKind, Table};
use strata_core::{Dialect, SelectBuilder, dialect_by_name};

pub fn dialect(name: &str) -> &'static dyn Dialect {
    dialect_by_name(name).unwrap_or_else(|| panic!("Unknown dialect: {name}"))
}

pub fn parse(sql: &str) -> SelectBuilder {
    SelectBuilder::from_sql(sql).unwrap_or_else(|| panic!("Failed to parse: {sql}"))
}

/// Verifies that rendering is a fixed point: the rendered statement parses
/// back to the same builder state and renders identically.
pub fn round_trip(sql: &str) {
    let first = parse(sql);
    let rendered = first.render();
    let second = parse(&rendered);
    assert_eq!(
        first, second,
        "Round-trip failed.\n  Input:    {sql}\n  Rendered: {rendered}"
    );
    assert_eq!(rendered, second.render());
}

/// The `Users` table most diff tests start from.
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
