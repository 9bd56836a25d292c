//! Semantic column types.
//!
//! A [`DataKind`] is the driver-neutral type of a column. Dialects map it to
//! a native type name when rendering DDL and map native names back to it when
//! a live schema is probed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The semantic type of a column, independent of any database product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataKind {
    /// `true` / `false`.
    Boolean,
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Single precision float.
    Single,
    /// Double precision float.
    Double,
    /// Fixed-point decimal.
    Decimal,
    /// Date and time.
    DateTime,
    /// 128-bit unique identifier.
    Guid,
    /// Character data.
    #[default]
    String,
    /// Binary data.
    Binary,
}

impl DataKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Boolean,
        Self::Byte,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Single,
        Self::Double,
        Self::Decimal,
        Self::DateTime,
        Self::Guid,
        Self::String,
        Self::Binary,
    ];

    /// Returns the canonical name used in exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Single => "Single",
            Self::Double => "Double",
            Self::Decimal => "Decimal",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::String => "String",
            Self::Binary => "Binary",
        }
    }

    /// Returns `true` for the integer kinds.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Byte | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Returns `true` for character data.
    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a kind name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data kind `{0}`")]
pub struct UnknownDataKind(pub String);

impl FromStr for DataKind {
    type Err = UnknownDataKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
            .or_else(|| match name.to_ascii_lowercase().as_str() {
                "bool" => Some(Self::Boolean),
                "short" => Some(Self::Int16),
                "int" => Some(Self::Int32),
                "long" => Some(Self::Int64),
                "float" => Some(Self::Single),
                "datetime2" | "date" => Some(Self::DateTime),
                "bytes" | "byte[]" => Some(Self::Binary),
                _ => None,
            })
            .ok_or_else(|| UnknownDataKind(name.to_string()))
    }
}

impl Serialize for DataKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DataKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_alias_names() {
        assert_eq!("Int32".parse::<DataKind>(), Ok(DataKind::Int32));
        assert_eq!("datetime".parse::<DataKind>(), Ok(DataKind::DateTime));
        assert_eq!("long".parse::<DataKind>(), Ok(DataKind::Int64));
        assert!("varchar".parse::<DataKind>().is_err());
    }

    #[test]
    fn integer_kinds() {
        assert!(DataKind::Byte.is_integer());
        assert!(DataKind::Int64.is_integer());
        assert!(!DataKind::Decimal.is_integer());
    }
}
