//! Error types for the strata core.

use crate::ddl::SchemaOpKind;
use crate::pagination::PageStrategy;

/// Errors raised while paginating a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// The selected strategy needs ordering or key information the query
    /// does not carry.
    #[error("{strategy} pagination requires an ordering key")]
    MissingKey {
        /// The strategy that could not run.
        strategy: PageStrategy,
    },

    /// The selected strategy cannot page to the end of the result.
    #[error("{strategy} pagination requires a row bound")]
    Unbounded {
        /// The strategy that could not run.
        strategy: PageStrategy,
    },
}

/// Errors raised while rendering DDL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DdlError {
    /// The dialect has no renderer for the operation.
    #[error("{operation} is not supported by the {dialect} dialect")]
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// Operation tag.
        operation: SchemaOpKind,
    },
}

/// Errors raised while reading or writing the XML export format.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Serialization failed.
    #[error("Failed to write schema export: {0}")]
    Write(String),

    /// The document is not a valid export.
    #[error("Failed to read schema export: {0}")]
    Read(String),

    /// IO error reading or writing an export file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while assembling a table from probed schema rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// A required field is absent from a row.
    #[error("{collection} row is missing `{field}`")]
    MissingField {
        /// Schema collection the row came from.
        collection: &'static str,
        /// Field name.
        field: &'static str,
    },
}
