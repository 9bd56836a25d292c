//! Error types for schema reconciliation.

use strata_core::{DdlError, ExportError, ProbeError};

/// Errors that can occur while reconciling a schema.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The session collaborator failed. Propagated unchanged.
    #[error("Session error: {0}")]
    Session(String),

    /// An operation could not be rendered for the session's dialect.
    #[error(transparent)]
    Ddl(#[from] DdlError),

    /// A schema export could not be read or written.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Probed schema rows could not be assembled into a table.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid sync configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Database error surfaced by a sqlx-backed session.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
