//! Column model.

use serde::{Deserialize, Serialize};

use super::kind::DataKind;
use crate::dialect::DialectKind;

/// A single column of a [`Table`](super::Table).
///
/// `raw_type` is the driver-native type name. It is only reused verbatim
/// when DDL is rendered for the same dialect that produced it; otherwise the
/// target dialect derives its own type name from `data_kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Column")]
pub struct Column {
    /// 1-based ordinal within the table.
    #[serde(rename = "@Id", default)]
    pub id: u32,
    /// Column name.
    #[serde(rename = "@Name")]
    pub name: String,
    /// Semantic type.
    #[serde(rename = "@DataType", default)]
    pub data_kind: DataKind,
    /// Driver-native type name.
    #[serde(rename = "@RawType", default)]
    pub raw_type: String,
    /// Value generated by the database on insert.
    #[serde(rename = "@Identity", default)]
    pub identity: bool,
    /// Part of the primary key.
    #[serde(rename = "@PrimaryKey", default)]
    pub primary_key: bool,
    /// Character length, or precision for decimals. `0` or less means unbounded.
    #[serde(rename = "@Length", default)]
    pub length: i32,
    /// Storage size in bytes.
    #[serde(rename = "@ByteSize", default)]
    pub byte_size: i32,
    /// Decimal scale.
    #[serde(rename = "@Scale", default)]
    pub scale: i32,
    /// Accepts NULL.
    #[serde(rename = "@Nullable", default)]
    pub nullable: bool,
    /// Default value text, without driver decoration.
    #[serde(
        rename = "@Default",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
    /// Free-form description.
    #[serde(rename = "@Description", default)]
    pub description: String,
    #[serde(skip)]
    pub(crate) origin: Option<DialectKind>,
}

impl Column {
    /// Creates a nullable column of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, data_kind: DataKind) -> Self {
        Self {
            id: 0,
            name: name.into(),
            data_kind,
            raw_type: String::new(),
            identity: false,
            primary_key: false,
            length: 0,
            byte_size: 0,
            scale: 0,
            nullable: true,
            default: None,
            description: String::new(),
            origin: None,
        }
    }

    /// Sets the character length (or decimal precision).
    #[must_use]
    pub const fn length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    /// Sets the decimal scale.
    #[must_use]
    pub const fn scale(mut self, scale: i32) -> Self {
        self.scale = scale;
        self
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as (part of) the primary key. Implies NOT NULL.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as database-generated.
    #[must_use]
    pub const fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Sets the default value text.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the driver-native type name.
    #[must_use]
    pub fn raw_type(mut self, raw_type: impl Into<String>) -> Self {
        self.raw_type = raw_type.into();
        self
    }

    /// Returns the dialect that produced `raw_type`, if known.
    #[must_use]
    pub const fn origin(&self) -> Option<DialectKind> {
        self.origin
    }

    /// Returns the default value with surrounding whitespace removed, or
    /// `None` when it is absent or blank.
    #[must_use]
    pub fn default_text(&self) -> Option<&str> {
        self.default
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}
