//! XML export format.
//!
//! A table serializes as a `<Table>` element whose scalar fields are
//! attributes and whose columns, indexes and foreign keys are child
//! elements:
//!
//! ```xml
//! <Table Id="0" Name="Users" Alias="Users" Description="" IsView="false" Owner="">
//!   <Column Id="1" Name="Id" DataType="Int32" ... />
//!   <Index Name="IX_Users_Email" Columns="Email" Unique="true" PrimaryKey="false"/>
//! </Table>
//! ```
//!
//! A schema snapshot is a `<Tables>` element holding any number of tables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::table::Table;
use crate::error::ExportError;

impl Table {
    /// Serializes the table as a `<Table>` element.
    pub fn to_xml(&self) -> Result<String, ExportError> {
        quick_xml::se::to_string(self).map_err(|e| ExportError::Write(e.to_string()))
    }

    /// Reads a table from a `<Table>` element.
    pub fn from_xml(xml: &str) -> Result<Self, ExportError> {
        let mut table: Self =
            quick_xml::de::from_str(xml).map_err(|e| ExportError::Read(e.to_string()))?;
        table.normalize();
        Ok(table)
    }
}

/// A schema snapshot: an ordered list of tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "Tables")]
pub struct Tables {
    #[serde(rename = "Table", default)]
    pub tables: Vec<Table>,
}

impl Tables {
    #[must_use]
    pub const fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Serializes the snapshot as a `<Tables>` document.
    pub fn to_xml(&self) -> Result<String, ExportError> {
        quick_xml::se::to_string(self).map_err(|e| ExportError::Write(e.to_string()))
    }

    /// Reads a snapshot from a `<Tables>` document.
    pub fn from_xml(xml: &str) -> Result<Self, ExportError> {
        let mut snapshot: Self =
            quick_xml::de::from_str(xml).map_err(|e| ExportError::Read(e.to_string()))?;
        for table in &mut snapshot.tables {
            table.normalize();
        }
        Ok(snapshot)
    }

    /// Writes the snapshot to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        std::fs::write(path, self.to_xml()?)?;
        Ok(())
    }

    /// Reads a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        Self::from_xml(&std::fs::read_to_string(path)?)
    }

    /// Finds a table by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.is_named(name))
    }
}

impl From<Vec<Table>> for Tables {
    fn from(tables: Vec<Table>) -> Self {
        Self::new(tables)
    }
}
