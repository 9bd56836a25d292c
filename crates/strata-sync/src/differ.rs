//! Schema reconciliation.
//!
//! [`SchemaSync`] drives one connection through the reconciliation pass:
//! load the declared tables, probe the observed ones, diff each declared
//! table against its observed counterpart and hand the result to the
//! [`SchemaExecutor`]. The pass can run inline or on a background task.

use std::sync::Arc;

use serde::Serialize;
use strata_core::schema::Table;
use strata_core::{TableDiff, diff_table};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{ObservedSchema, SchemaCache};
use crate::config::{SyncConfig, SyncMode};
use crate::error::Result;
use crate::executor::{SchemaExecutor, TableReport};
use crate::probe::{observe_schema, observe_table};
use crate::session::{EntityCatalog, SchemaSession};

/// Outcome of one reconciliation pass over a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub connection: String,
    pub mode: SyncMode,
    /// One report per declared table that was diffed.
    pub tables: Vec<TableReport>,
    /// Tables whose probe failed and were left alone.
    pub unresolved: Vec<String>,
}

impl SyncReport {
    fn new(connection: &str, mode: SyncMode) -> Self {
        Self {
            connection: connection.to_string(),
            mode,
            ..Self::default()
        }
    }

    /// Returns the report of `table`.
    #[must_use]
    pub fn table(&self, table: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table.eq_ignore_ascii_case(table))
    }

    /// Total statements rendered across every table.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.tables.iter().map(|t| t.statements.len()).sum()
    }

    /// Total statements that failed to apply.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tables.iter().map(|t| t.failed.len()).sum()
    }

    /// Returns `true` if no table needed any change.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.tables.iter().all(TableReport::is_converged)
    }
}

/// Reconciles one connection's live schema with its declared tables.
pub struct SchemaSync {
    session: Arc<dyn SchemaSession>,
    catalog: Arc<dyn EntityCatalog>,
    config: SyncConfig,
    cache: Arc<SchemaCache>,
}

impl SchemaSync {
    /// Creates a reconciler with its own cache.
    pub fn new(
        session: Arc<dyn SchemaSession>,
        catalog: Arc<dyn EntityCatalog>,
        config: SyncConfig,
    ) -> Self {
        Self {
            session,
            catalog,
            config,
            cache: Arc::new(SchemaCache::new()),
        }
    }

    /// Shares `cache` with other reconcilers of the same connection.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = cache;
        self
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn session(&self) -> &dyn SchemaSession {
        self.session.as_ref()
    }

    /// Returns `false` when the mode is off or the connection is excluded.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.mode.is_enabled() && !self.config.is_excluded(self.session.connection_name())
    }

    /// The declared tables bound to this connection, minus excluded names.
    /// Built once.
    pub async fn declared_tables(&self) -> Result<Arc<Vec<Table>>> {
        self.cache
            .declared()
            .get_or_try_init(|| async {
                let connection = self.session.connection_name();
                let tables: Vec<Table> = self
                    .catalog
                    .declared_tables(connection)
                    .into_iter()
                    .filter(|t| !self.config.is_excluded(t.name()))
                    .collect();
                debug!(connection = %connection, tables = tables.len(), "Loaded declared tables");
                Ok(tables)
            })
            .await
    }

    /// The observed snapshot of this connection. Built once until
    /// invalidated; concurrent callers share one probe.
    pub async fn observed_tables(&self) -> Result<Arc<ObservedSchema>> {
        self.cache
            .observed()
            .get_or_try_init(|| observe_schema(self.session.as_ref(), &self.config))
            .await
    }

    /// Reconciles every declared table.
    pub async fn reconcile_all(&self) -> Result<SyncReport> {
        let connection = self.session.connection_name();
        let mut report = SyncReport::new(connection, self.config.mode);
        if !self.is_enabled() {
            debug!(connection = %connection, mode = %self.config.mode, "Schema sync skipped");
            return Ok(report);
        }

        let declared = self.declared_tables().await?;
        let observed = self.observed_tables().await?;
        report.unresolved.clone_from(&observed.unresolved);

        for table in declared.iter() {
            if !self.cache.begin(table.name()) {
                debug!(table = %table.name(), "Table already reconciled");
                continue;
            }
            if observed.is_unresolved(table.name()) {
                continue;
            }
            let diff = diff_table(table, observed.get(table.name()), self.session.dialect());
            match self.apply(&diff).await {
                Ok(table_report) => report.tables.push(table_report),
                Err(e) => {
                    self.cache.forget(table.name());
                    return Err(e);
                }
            }
        }

        self.finish(&report.tables);
        info!(
            connection = %connection,
            mode = %self.config.mode,
            tables = report.tables.len(),
            statements = report.statement_count(),
            failed = report.failure_count(),
            "Schema sync complete"
        );
        Ok(report)
    }

    /// Reconciles one declared table the first time it is asked for.
    ///
    /// Returns `None` when sync is disabled, the table is excluded or not
    /// declared, or another caller already claimed it. A failed attempt
    /// releases the claim.
    pub async fn ensure_table(&self, name: &str) -> Result<Option<TableReport>> {
        if !self.is_enabled() || self.config.is_excluded(name) {
            return Ok(None);
        }
        if !self.cache.begin(name) {
            debug!(table = %name, "Table already reconciled");
            return Ok(None);
        }

        let declared = self.declared_tables().await?;
        let Some(table) = declared.iter().find(|t| t.is_named(name)) else {
            debug!(table = %name, "Table is not declared");
            return Ok(None);
        };

        match self.reconcile_table(table).await {
            Ok(report) => {
                self.finish(std::slice::from_ref(&report));
                Ok(Some(report))
            }
            Err(e) => {
                // Unclaim so a later call retries.
                self.cache.forget(name);
                Err(e)
            }
        }
    }

    async fn reconcile_table(&self, table: &Table) -> Result<TableReport> {
        let observed = observe_table(self.session.as_ref(), table.name()).await?;
        let diff = diff_table(table, observed.as_ref(), self.session.dialect());
        self.apply(&diff).await
    }

    /// Runs [`reconcile_all`](Self::reconcile_all) on a background task.
    /// Errors are logged, never returned.
    pub fn spawn_reconcile_all(self: &Arc<Self>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = sync.reconcile_all().await {
                error!(
                    connection = %sync.session.connection_name(),
                    error = %e,
                    "Background schema sync failed"
                );
            }
        })
    }

    /// Runs [`ensure_table`](Self::ensure_table) on a background task.
    /// Errors are logged, never returned.
    pub fn spawn_ensure_table(self: &Arc<Self>, name: impl Into<String>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        let name = name.into();
        tokio::spawn(async move {
            if let Err(e) = sync.ensure_table(&name).await {
                error!(table = %name, error = %e, "Background table sync failed");
            }
        })
    }

    async fn apply(&self, diff: &TableDiff) -> Result<TableReport> {
        if self.config.debug && !diff.is_empty() {
            let kinds: Vec<_> = diff.operations.iter().map(|op| op.kind()).collect();
            debug!(table = %diff.table, operations = ?kinds, "Schema diff");
        }
        SchemaExecutor::new(self.session.as_ref())
            .dry_run(self.config.mode != SyncMode::Apply)
            .no_delete(self.config.no_delete)
            .apply(diff)
            .await
    }

    fn finish(&self, reports: &[TableReport]) {
        if self.config.mode == SyncMode::Apply && reports.iter().any(|r| r.applied > 0) {
            self.cache.invalidate_observed();
        }
    }
}
