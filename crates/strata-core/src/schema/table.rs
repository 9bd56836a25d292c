//! Table model.

use heck::ToUpperCamelCase;
use serde::{Deserialize, Serialize};

use super::column::Column;
use super::index::{ForeignKey, Index};
use crate::dialect::DialectKind;

/// Name prefixes dropped when deriving an alias.
const ALIAS_PREFIXES: [&str; 3] = ["tbl_", "tb_", "t_"];

/// A table or view.
///
/// `alias` is a code-friendly name derived from `name`. It is recomputed
/// every time the name changes, unless overridden with [`Table::set_alias`]
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Table")]
pub struct Table {
    #[serde(rename = "@Id", default)]
    pub id: u32,
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@Alias", default)]
    alias: String,
    #[serde(rename = "@Description", default)]
    pub description: String,
    #[serde(rename = "@IsView", default)]
    pub is_view: bool,
    #[serde(rename = "@Owner", default)]
    pub owner: String,
    /// Dialect the column types were read from or declared for.
    #[serde(
        rename = "@Dialect",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    dialect: Option<DialectKind>,
    #[serde(rename = "Column", default)]
    columns: Vec<Column>,
    #[serde(rename = "Index", default)]
    pub indexes: Vec<Index>,
    #[serde(rename = "ForeignKey", default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: 0,
            alias: derive_alias(&name),
            name,
            description: String::new(),
            is_view: false,
            owner: String::new(),
            dialect: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Sets the dialect, builder style.
    #[must_use]
    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.set_dialect(Some(dialect));
        self
    }

    /// Adds a column, builder style.
    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Adds an index, builder style.
    #[must_use]
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the table and re-derives its alias.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.alias = derive_alias(&self.name);
    }

    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Overrides the derived alias until the next rename.
    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = alias.into();
    }

    #[must_use]
    pub const fn dialect(&self) -> Option<DialectKind> {
        self.dialect
    }

    /// Sets the dialect and stamps it on every column as its type origin.
    pub fn set_dialect(&mut self, dialect: Option<DialectKind>) {
        self.dialect = dialect;
        for column in &mut self.columns {
            column.origin = dialect;
        }
    }

    /// Columns in ordinal order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Appends a column. A zero ordinal becomes the next position.
    pub fn add_column(&mut self, mut column: Column) -> &mut Self {
        column.origin = self.dialect;
        if column.id == 0 {
            column.id = u32::try_from(self.columns.len() + 1).unwrap_or(u32::MAX);
        }
        self.columns.push(column);
        self
    }

    /// Finds a column by case-insensitive name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    /// Finds a column by case-insensitive name for editing.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.is_named(name))
    }

    /// Removes a column by case-insensitive name.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let position = self.columns.iter().position(|c| c.is_named(name))?;
        Some(self.columns.remove(position))
    }

    /// Columns that form the primary key.
    pub fn primary_key(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Restores the invariants serde cannot: the alias, column origins, and
    /// sequential ordinals when every column reports zero.
    pub(crate) fn normalize(&mut self) {
        if self.alias.is_empty() {
            self.alias = derive_alias(&self.name);
        }
        self.set_dialect(self.dialect);
        if self.columns.iter().all(|c| c.id == 0) {
            for (position, column) in (1u32..).zip(self.columns.iter_mut()) {
                column.id = position;
            }
        }
    }
}

/// Derives a code-friendly alias: known prefixes are stripped, the rest is
/// converted to `UpperCamelCase`, and a leading digit gets an underscore.
fn derive_alias(name: &str) -> String {
    let trimmed = name.trim();
    let lower = trimmed.to_ascii_lowercase();
    let mut stem = ALIAS_PREFIXES
        .iter()
        .find(|prefix| lower.starts_with(*prefix) && lower.len() > prefix.len())
        .map_or(trimmed, |prefix| &trimmed[prefix.len()..]);

    // tblUsers
    if stem == trimmed
        && lower.starts_with("tbl")
        && trimmed[3..].starts_with(|c: char| c.is_ascii_uppercase())
    {
        stem = &trimmed[3..];
    }

    let alias = stem.to_upper_camel_case();
    if alias.is_empty() {
        return trimmed.to_string();
    }
    if alias.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{alias}")
    } else {
        alias
    }
}
