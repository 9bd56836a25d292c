//! # strata-sync
//!
//! Reconciles a live database schema with a declared model.
//!
//! A reconciliation pass:
//! - loads the declared tables bound to a connection ([`EntityCatalog`])
//! - probes the observed tables through a [`SchemaSession`]
//! - diffs them with [`strata_core::diff_table`]
//! - logs or applies the resulting DDL, best effort, per [`SyncConfig`]
//!
//! Declared and observed snapshots are cached per reconciler in
//! single-flight cells ([`SchemaCache`]), so concurrent callers never probe
//! twice. Passes run inline ([`SchemaSync::reconcile_all`]) or on a
//! background task ([`SchemaSync::spawn_reconcile_all`]).
//!
//! [`SqliteSession`] is the bundled session; other drivers implement
//! [`SchemaSession`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use strata_core::schema::{Column, DataKind, Table};
//! use strata_sync::prelude::*;
//!
//! # async fn run() -> strata_sync::Result<()> {
//! let session = SqliteSession::connect("sqlite:app.db").await?;
//! let catalog = StaticCatalog::default().table(
//!     Table::new("Users")
//!         .with_column(Column::new("Id", DataKind::Int64).primary_key().identity())
//!         .with_column(Column::new("Email", DataKind::String).length(100)),
//! );
//!
//! let sync = SchemaSync::new(
//!     Arc::new(session),
//!     Arc::new(catalog),
//!     SyncConfig::new(SyncMode::Apply),
//! );
//! let report = sync.reconcile_all().await?;
//! println!("{} statements", report.statement_count());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod differ;
pub mod error;
pub mod executor;
pub mod probe;
pub mod session;
pub mod sqlite;

pub use cache::{ObservedSchema, SchemaCache, SingleFlight};
pub use config::{SyncConfig, SyncMode};
pub use differ::{SchemaSync, SyncReport};
pub use error::{Result, SyncError};
pub use executor::{SchemaExecutor, SchemaOutcome, TableReport, set_schema};
pub use session::{EntityCatalog, SchemaSession, StaticCatalog};
pub use sqlite::SqliteSession;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{SyncConfig, SyncMode};
    pub use crate::differ::{SchemaSync, SyncReport};
    pub use crate::error::{Result, SyncError};
    pub use crate::executor::{SchemaOutcome, set_schema};
    pub use crate::session::{EntityCatalog, SchemaSession, StaticCatalog};
    pub use crate::sqlite::SqliteSession;
}
