//! The schema operation catalogue.
//!
//! Every structural change the differ can request, and every existence
//! check the executor can ask, is one [`SchemaOp`] variant carrying exactly
//! the arguments it needs. Dialects turn operations into SQL through
//! [`Dialect::render`](crate::dialect::Dialect::render).

use std::fmt;

use serde::Serialize;

use crate::schema::{Column, Index, Table};

/// One schema operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOp {
    /// Create a database, optionally at a file path.
    CreateDatabase { name: String, path: Option<String> },
    DropDatabase { name: String },
    /// Query: does the database exist?
    DatabaseExists { name: String },
    CreateTable { table: Table },
    DropTable { name: String },
    /// Query: does the table exist?
    TableExists { name: String },
    AddTableDescription { table: String, description: String },
    DropTableDescription { table: String },
    AddColumn { table: String, column: Column },
    /// Redefine `column`; `previous` is the definition it replaces.
    AlterColumn {
        table: String,
        column: Column,
        previous: Column,
    },
    DropColumn { table: String, column: String },
    AddColumnDescription { table: String, column: Column },
    DropColumnDescription { table: String, column: Column },
    AddDefault { table: String, column: Column },
    /// Drop the default of `column`, which still carries the old value.
    DropDefault { table: String, column: Column },
    CreateIndex { table: String, index: Index },
    DropIndex { table: String, index: Index },
}

/// The tag of a [`SchemaOp`], without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SchemaOpKind {
    CreateDatabase,
    DropDatabase,
    DatabaseExists,
    CreateTable,
    DropTable,
    TableExists,
    AddTableDescription,
    DropTableDescription,
    AddColumn,
    AlterColumn,
    DropColumn,
    AddColumnDescription,
    DropColumnDescription,
    AddDefault,
    DropDefault,
    CreateIndex,
    DropIndex,
}

impl fmt::Display for SchemaOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl SchemaOp {
    /// Returns the operation tag.
    #[must_use]
    pub const fn kind(&self) -> SchemaOpKind {
        match self {
            Self::CreateDatabase { .. } => SchemaOpKind::CreateDatabase,
            Self::DropDatabase { .. } => SchemaOpKind::DropDatabase,
            Self::DatabaseExists { .. } => SchemaOpKind::DatabaseExists,
            Self::CreateTable { .. } => SchemaOpKind::CreateTable,
            Self::DropTable { .. } => SchemaOpKind::DropTable,
            Self::TableExists { .. } => SchemaOpKind::TableExists,
            Self::AddTableDescription { .. } => SchemaOpKind::AddTableDescription,
            Self::DropTableDescription { .. } => SchemaOpKind::DropTableDescription,
            Self::AddColumn { .. } => SchemaOpKind::AddColumn,
            Self::AlterColumn { .. } => SchemaOpKind::AlterColumn,
            Self::DropColumn { .. } => SchemaOpKind::DropColumn,
            Self::AddColumnDescription { .. } => SchemaOpKind::AddColumnDescription,
            Self::DropColumnDescription { .. } => SchemaOpKind::DropColumnDescription,
            Self::AddDefault { .. } => SchemaOpKind::AddDefault,
            Self::DropDefault { .. } => SchemaOpKind::DropDefault,
            Self::CreateIndex { .. } => SchemaOpKind::CreateIndex,
            Self::DropIndex { .. } => SchemaOpKind::DropIndex,
        }
    }

    /// Existence checks are answered by counting rows, not by executing.
    #[must_use]
    pub const fn is_query(&self) -> bool {
        matches!(
            self,
            Self::TableExists { .. } | Self::DatabaseExists { .. }
        )
    }

    /// Operations that remove structure and fall under the no-delete guard.
    #[must_use]
    pub const fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DropColumn { .. }
                | Self::DropIndex { .. }
                | Self::DropTable { .. }
                | Self::DropDatabase { .. }
        )
    }

    /// Name of the table the operation touches, if any.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table } => Some(table.name()),
            Self::DropTable { name } | Self::TableExists { name } => Some(name),
            Self::AddTableDescription { table, .. }
            | Self::DropTableDescription { table }
            | Self::AddColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AddColumnDescription { table, .. }
            | Self::DropColumnDescription { table, .. }
            | Self::AddDefault { table, .. }
            | Self::DropDefault { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. } => Some(table),
            Self::CreateDatabase { .. }
            | Self::DropDatabase { .. }
            | Self::DatabaseExists { .. } => None,
        }
    }
}
