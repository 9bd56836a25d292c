//! Reverse engineering a live schema through a session.

use strata_core::schema::Table;
use strata_core::schema::probe::{SchemaCollection, SchemaRow, table_from_rows};
use tracing::{debug, warn};

use crate::cache::ObservedSchema;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::session::SchemaSession;

/// Probes every table of the session's database, skipping excluded names.
///
/// A failure while reading one table's columns or indexes is logged and the
/// table is recorded as unresolved; the remaining tables are still probed.
/// Failing to list the tables at all is propagated.
pub async fn observe_schema(session: &dyn SchemaSession, config: &SyncConfig) -> Result<ObservedSchema> {
    let rows = session.probe_schema(SchemaCollection::Tables, None).await?;
    let mut observed = ObservedSchema::default();

    for row in rows {
        let name = row.text("TABLE_NAME").to_string();
        if name.is_empty() || config.is_excluded(&name) {
            continue;
        }
        match observe_row(session, &row).await {
            Ok(table) => observed.tables.push(table),
            Err(e) => {
                warn!(
                    connection = %session.connection_name(),
                    table = %name,
                    error = %e,
                    "Failed to read table schema, leaving it unresolved"
                );
                observed.unresolved.push(name);
            }
        }
    }

    debug!(
        connection = %session.connection_name(),
        tables = observed.tables.len(),
        unresolved = observed.unresolved.len(),
        "Probed schema"
    );
    Ok(observed)
}

/// Probes a single table. Returns `None` if it does not exist.
pub async fn observe_table(session: &dyn SchemaSession, name: &str) -> Result<Option<Table>> {
    let rows = session
        .probe_schema(SchemaCollection::Tables, Some(name))
        .await?;
    let Some(row) = rows
        .into_iter()
        .find(|row| row.text("TABLE_NAME").eq_ignore_ascii_case(name))
    else {
        return Ok(None);
    };
    observe_row(session, &row).await.map(Some)
}

async fn observe_row(session: &dyn SchemaSession, row: &SchemaRow) -> Result<Table> {
    let name = row.text("TABLE_NAME");
    let columns = session
        .probe_schema(SchemaCollection::Columns, Some(name))
        .await?;
    let indexes = session
        .probe_schema(SchemaCollection::Indexes, Some(name))
        .await?;
    Ok(table_from_rows(session.dialect(), row, &columns, &indexes)?)
}
