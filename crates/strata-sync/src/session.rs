//! The collaborators reconciliation talks to.
//!
//! A [`SchemaSession`] is an open connection that can answer schema probes
//! and run statements. An [`EntityCatalog`] supplies the declared tables
//! bound to a connection.

use strata_core::Dialect;
use strata_core::schema::Table;
use strata_core::schema::probe::{SchemaCollection, SchemaRow};

use crate::error::Result;

/// An open database session.
///
/// Driver and connection failures surface as [`SyncError`](crate::SyncError)
/// and are propagated unchanged; the session adds no retries of its own.
#[async_trait::async_trait]
pub trait SchemaSession: Send + Sync {
    /// Name of the connection, matched against the exclusion list.
    fn connection_name(&self) -> &str;

    /// The dialect statements are rendered for.
    fn dialect(&self) -> &'static dyn Dialect;

    /// Queries one schema-information collection.
    ///
    /// `table` restricts `Tables`, `Columns` and `Indexes` to one table; the
    /// latter two require it.
    async fn probe_schema(
        &self,
        collection: SchemaCollection,
        table: Option<&str>,
    ) -> Result<Vec<SchemaRow>>;

    /// Executes a single statement and returns the affected row count.
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Runs a query and returns the first column of the first row as text.
    async fn query_scalar(&self, sql: &str) -> Result<Option<String>>;
}

/// Source of declared tables.
pub trait EntityCatalog: Send + Sync {
    /// Returns every table declared for `connection`.
    fn declared_tables(&self, connection: &str) -> Vec<Table>;
}

/// A catalog holding a fixed list of tables, bound to every connection.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tables: Vec<Table>,
}

impl StaticCatalog {
    #[must_use]
    pub const fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }
}

impl From<strata_core::Tables> for StaticCatalog {
    fn from(tables: strata_core::Tables) -> Self {
        Self::new(tables.tables)
    }
}

impl EntityCatalog for StaticCatalog {
    fn declared_tables(&self, _connection: &str) -> Vec<Table> {
        self.tables.clone()
    }
}
