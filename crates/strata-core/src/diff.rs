//! Schema diff engine.
//!
//! Compares a declared table with the table observed in a live database and
//! produces the [`SchemaOp`]s that converge the database onto the
//! declaration. Operations come out in the order they must run: column
//! additions and alterations, then column drops, then table metadata, then
//! index drops and index creations. Observed tables without a declaration
//! are never dropped.

use tracing::debug;

use crate::ddl::SchemaOp;
use crate::dialect::{Dialect, boolean_text, is_now_literal, strip_parens};
use crate::schema::{Column, DataKind, Index, Table};

/// The operations converging one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDiff {
    pub table: String,
    pub operations: Vec<SchemaOp>,
}

impl TableDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations that remove a structure or data.
    pub fn destructive(&self) -> impl Iterator<Item = &SchemaOp> {
        self.operations.iter().filter(|op| op.is_destructive())
    }
}

/// Diffs every declared table against its observed counterpart, matched
/// case-insensitively by name. Tables already in sync are left out.
#[must_use]
pub fn diff_schema(declared: &[Table], observed: &[Table], target: &dyn Dialect) -> Vec<TableDiff> {
    declared
        .iter()
        .map(|table| {
            let current = observed.iter().find(|o| o.is_named(table.name()));
            diff_table(table, current, target)
        })
        .filter(|diff| !diff.is_empty())
        .collect()
}

/// Diffs one declared table against the observed one, or against nothing
/// when the table does not exist yet.
#[must_use]
pub fn diff_table(declared: &Table, observed: Option<&Table>, target: &dyn Dialect) -> TableDiff {
    let name = declared.name().to_string();
    let operations = if declared.is_view {
        Vec::new()
    } else {
        match observed {
            None => create_operations(declared, target),
            Some(observed) => {
                let mut operations = column_operations(declared, observed, target);
                operations.extend(description_operations(declared, observed, target));
                operations.extend(index_operations(declared, observed));
                operations
            }
        }
    };
    debug!(table = %name, operations = operations.len(), "Diffed table");
    TableDiff {
        table: name,
        operations,
    }
}

fn create_operations(declared: &Table, target: &dyn Dialect) -> Vec<SchemaOp> {
    let table = declared.name().to_string();
    let mut operations = vec![SchemaOp::CreateTable {
        table: declared.clone(),
    }];
    if target.supports_descriptions() {
        if !declared.description.trim().is_empty() {
            operations.push(SchemaOp::AddTableDescription {
                table: table.clone(),
                description: declared.description.clone(),
            });
        }
        operations.extend(
            declared
                .columns()
                .iter()
                .filter(|c| !c.description.trim().is_empty())
                .map(|c| SchemaOp::AddColumnDescription {
                    table: table.clone(),
                    column: c.clone(),
                }),
        );
    }
    operations.extend(
        secondary(&declared.indexes).map(|index| SchemaOp::CreateIndex {
            table: table.clone(),
            index: index.clone(),
        }),
    );
    operations
}

fn column_operations(declared: &Table, observed: &Table, target: &dyn Dialect) -> Vec<SchemaOp> {
    let table = declared.name().to_string();
    let declaring = declared.dialect().map(|kind| kind.dialect());
    let mut operations = Vec::new();

    for column in declared.columns() {
        let Some(current) = observed.column(&column.name) else {
            operations.push(SchemaOp::AddColumn {
                table: table.clone(),
                column: column.clone(),
            });
            if target.supports_descriptions() && !column.description.trim().is_empty() {
                operations.push(SchemaOp::AddColumnDescription {
                    table: table.clone(),
                    column: column.clone(),
                });
            }
            continue;
        };

        if column_changed(column, current, target) {
            operations.push(SchemaOp::AlterColumn {
                table: table.clone(),
                column: column.clone(),
                previous: current.clone(),
            });
        }

        if !column.identity && !defaults_equal(column, current, declaring, target) {
            if current.default_text().is_some() {
                operations.push(SchemaOp::DropDefault {
                    table: table.clone(),
                    column: current.clone(),
                });
            }
            if column.default_text().is_some() {
                operations.push(SchemaOp::AddDefault {
                    table: table.clone(),
                    column: column.clone(),
                });
            }
        }

        if target.supports_descriptions()
            && column.description.trim() != current.description.trim()
        {
            if !current.description.trim().is_empty() {
                operations.push(SchemaOp::DropColumnDescription {
                    table: table.clone(),
                    column: current.clone(),
                });
            }
            if !column.description.trim().is_empty() {
                operations.push(SchemaOp::AddColumnDescription {
                    table: table.clone(),
                    column: column.clone(),
                });
            }
        }
    }

    operations.extend(
        observed
            .columns()
            .iter()
            .filter(|c| declared.column(&c.name).is_none())
            .map(|c| SchemaOp::DropColumn {
                table: table.clone(),
                column: c.name.clone(),
            }),
    );
    operations
}

fn description_operations(declared: &Table, observed: &Table, target: &dyn Dialect) -> Vec<SchemaOp> {
    let wanted = declared.description.trim();
    let current = observed.description.trim();
    if !target.supports_descriptions() || wanted == current {
        return Vec::new();
    }
    let table = declared.name().to_string();
    let mut operations = Vec::new();
    if !current.is_empty() {
        operations.push(SchemaOp::DropTableDescription {
            table: table.clone(),
        });
    }
    if !wanted.is_empty() {
        operations.push(SchemaOp::AddTableDescription {
            table,
            description: wanted.to_string(),
        });
    }
    operations
}

fn index_operations(declared: &Table, observed: &Table) -> Vec<SchemaOp> {
    let table = declared.name().to_string();
    let extra = secondary(&observed.indexes)
        .filter(|index| !secondary(&declared.indexes).any(|d| d.same_definition(index)))
        .map(|index| SchemaOp::DropIndex {
            table: table.clone(),
            index: index.clone(),
        });
    let missing = secondary(&declared.indexes)
        .filter(|index| !secondary(&observed.indexes).any(|o| o.same_definition(index)))
        .map(|index| SchemaOp::CreateIndex {
            table: table.clone(),
            index: index.clone(),
        });
    extra.chain(missing).collect()
}

/// Indexes other than the primary key.
fn secondary(indexes: &[Index]) -> impl Iterator<Item = &Index> {
    indexes.iter().filter(|index| !index.primary_key)
}

/// Whether `observed` needs an `ALTER` to match `declared`.
///
/// Nullability is ignored for identity and primary-key columns. String
/// lengths that both mean "unbounded" (non-positive, or above the target's
/// long-text threshold) compare equal whatever their values.
#[must_use]
pub fn column_changed(declared: &Column, observed: &Column, target: &dyn Dialect) -> bool {
    if !target.kinds_equivalent(declared.data_kind, observed.data_kind)
        || declared.identity != observed.identity
        || declared.primary_key != observed.primary_key
    {
        return true;
    }
    let keyed = declared.identity || declared.primary_key;
    if !keyed && declared.nullable != observed.nullable {
        return true;
    }
    declared.data_kind.is_string()
        && !lengths_equal(declared.length, observed.length, target.long_text_threshold())
}

fn lengths_equal(declared: i32, observed: i32, threshold: i32) -> bool {
    let unbounded = |length: i32| length <= 0 || length > threshold;
    (unbounded(declared) && unbounded(observed)) || declared == observed
}

/// Whether two defaults mean the same value.
///
/// Text compares case-insensitively once driver decoration is stripped.
/// Boolean spellings compare by value. On date-time columns, a declared
/// "now" in the declaring dialect's spelling equals the target dialect's
/// "now".
#[must_use]
pub fn defaults_equal(
    declared: &Column,
    observed: &Column,
    declaring: Option<&dyn Dialect>,
    target: &dyn Dialect,
) -> bool {
    let wanted = declared.default_text().and_then(|d| target.normalize_default(d));
    let current = observed.default_text().and_then(|d| target.normalize_default(d));
    let (wanted, current) = match (wanted, current) {
        (None, None) => return true,
        (Some(wanted), Some(current)) => (wanted, current),
        _ => return false,
    };
    if wanted.eq_ignore_ascii_case(&current) {
        return true;
    }
    if declared.data_kind == DataKind::Boolean {
        if let (Some(a), Some(b)) = (boolean_text(&wanted), boolean_text(&current)) {
            return a == b;
        }
    }
    if declared.data_kind != DataKind::DateTime {
        return false;
    }
    let declared_now = declaring.map_or_else(
        || is_now_literal(&wanted),
        |dialect| same_literal(&wanted, dialect.now_literal()),
    );
    declared_now && same_literal(&current, target.now_literal())
}

fn same_literal(text: &str, literal: &str) -> bool {
    let compact = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    };
    compact(strip_parens(text)) == compact(literal)
}
