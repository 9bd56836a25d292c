//! Index and foreign key models.

use serde::{Deserialize, Serialize};

/// An index over one or more columns.
///
/// Two indexes are equal when they cover the same columns, compared as an
/// unordered multiset of case-insensitive names. Name, uniqueness and the
/// primary-key flag do not take part in equality; use
/// [`same_definition`](Self::same_definition) to also compare uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Index")]
pub struct Index {
    /// Index name. Empty when the index has not been created yet.
    #[serde(rename = "@Name", default)]
    pub name: String,
    /// Covered columns in key order.
    #[serde(rename = "@Columns", with = "comma_list", default)]
    pub columns: Vec<String>,
    /// UNIQUE index.
    #[serde(rename = "@Unique", default)]
    pub unique: bool,
    /// Backs the primary key.
    #[serde(rename = "@PrimaryKey", default)]
    pub primary_key: bool,
}

impl Index {
    /// Creates a non-unique index over `columns`.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: String::new(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            primary_key: false,
        }
    }

    /// Marks the index UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the index name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the index name, generating `IX_<table>_<columns>` (or
    /// `PK_<table>`) when none was set.
    #[must_use]
    pub fn name_for(&self, table: &str) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        if self.primary_key {
            return format!("PK_{table}");
        }
        format!("IX_{table}_{}", self.columns.join("_"))
    }

    /// Returns `true` if both indexes cover the same column multiset.
    #[must_use]
    pub fn same_columns(&self, other: &Self) -> bool {
        self.sorted_key() == other.sorted_key()
    }

    /// Returns `true` if both indexes cover the same column multiset and
    /// agree on uniqueness.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.unique == other.unique && self.same_columns(other)
    }

    fn sorted_key(&self) -> Vec<String> {
        let mut key: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.trim().to_ascii_lowercase())
            .collect();
        key.sort_unstable();
        key
    }
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.same_columns(other)
    }
}

impl Eq for Index {}

/// A single-column foreign key reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "ForeignKey")]
pub struct ForeignKey {
    /// Referencing column in the owning table.
    #[serde(rename = "@Column")]
    pub column: String,
    /// Referenced table.
    #[serde(rename = "@RefTable")]
    pub ref_table: String,
    /// Referenced column.
    #[serde(rename = "@RefColumn")]
    pub ref_column: String,
}

impl ForeignKey {
    /// Creates a foreign key reference.
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            ref_table: ref_table.into(),
            ref_column: ref_column.into(),
        }
    }
}

/// Stores a list of names as a single comma-separated attribute.
///
/// Commas and backslashes inside a name are escaped with a backslash.
mod comma_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(names: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        let escaped: Vec<String> = names
            .iter()
            .map(|name| name.replace('\\', "\\\\").replace(',', "\\,"))
            .collect();
        serializer.serialize_str(&escaped.join(","))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Ok(split(&joined))
    }

    pub(super) fn split(joined: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = String::new();
        let mut chars = joined.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => current.extend(chars.next()),
                ',' => names.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        names.push(current);
        names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect()
    }
}
