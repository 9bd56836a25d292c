//! # strata-core
//!
//! Dialect-aware query paging and schema synchronization primitives.
//!
//! This crate provides:
//! - A `SELECT` builder that parses SQL text into clauses and renders it back
//! - A pagination strategist choosing between `TOP`, `LIMIT`/`OFFSET`,
//!   `ROW_NUMBER()`, max/min seek, double-`TOP` and `NOT IN` rewrites
//! - A table/column/index model with an XML export format
//! - A schema differ producing the operations that converge a database
//! - Per-dialect DDL rendering for SQL Server, SQLite, PostgreSQL and MySQL
//!
//! ## Paging
//!
//! ```rust
//! use strata_core::{dialect_by_name, page_split_sql};
//!
//! let dialect = dialect_by_name("sqlserver2000").unwrap();
//! let sql = page_split_sql(dialect, "SELECT * FROM T", 20, 10, Some("Id")).unwrap();
//! assert_eq!(
//!     sql,
//!     "SELECT TOP 10 * FROM T WHERE Id NOT IN (SELECT TOP 20 Id FROM T ORDER BY Id) ORDER BY Id"
//! );
//! ```
//!
//! ## Schema diffing
//!
//! ```rust
//! use strata_core::schema::{Column, DataKind, Table};
//! use strata_core::{DialectKind, SchemaOp, diff_table};
//!
//! let declared = Table::new("Users")
//!     .with_column(Column::new("Id", DataKind::Int32).primary_key().identity())
//!     .with_column(Column::new("Email", DataKind::String).length(100));
//! let observed = Table::new("Users")
//!     .with_column(Column::new("Id", DataKind::Int32).primary_key().identity());
//!
//! let dialect = DialectKind::SqlServer.dialect();
//! let diff = diff_table(&declared, Some(&observed), dialect);
//! assert!(matches!(diff.operations.as_slice(), [SchemaOp::AddColumn { .. }]));
//! assert_eq!(
//!     dialect.render(&diff.operations[0]).unwrap().as_deref(),
//!     Some("ALTER TABLE Users ADD Email NVARCHAR(100) NULL")
//! );
//! ```

pub mod ddl;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod pagination;
pub mod query;
pub mod schema;

pub use ddl::{SchemaOp, SchemaOpKind};
pub use dialect::{Dialect, DialectKind, PagingStyle, dialect_by_name};
pub use diff::{TableDiff, diff_schema, diff_table};
pub use error::{DdlError, ExportError, PageError, ProbeError};
pub use pagination::{PageRequest, PageStrategy, page_split, page_split_sql, select_strategy};
pub use query::SelectBuilder;
pub use schema::{Column, DataKind, Index, Table, Tables};
