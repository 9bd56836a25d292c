//! Schema operation executor.
//!
//! This module applies rendered DDL through a [`SchemaSession`], either one
//! operation at a time ([`set_schema`]) or a whole [`TableDiff`] at once
//! ([`SchemaExecutor`]).

use serde::Serialize;
use strata_core::dialect::STATEMENT_SEPARATOR;
use strata_core::{SchemaOp, SchemaOpKind, TableDiff};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::session::SchemaSession;

/// Alias given to an existence query when it is wrapped for counting.
const EXISTS_ALIAS: &str = "Exists_T0";

/// What executing one operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchemaOutcome {
    /// Answer to an existence check.
    Exists(bool),
    /// Statements ran; total affected rows.
    Executed(u64),
    /// The dialect performs the operation outside SQL.
    NonSql,
    /// Another statement already covers the operation.
    Skipped,
}

/// Renders `op` for the session's dialect and executes it.
///
/// Existence checks are answered as `COUNT(*) > 0` over the rendered query.
/// Scripts are split and run statement by statement, since not every driver
/// accepts batched DDL.
pub async fn set_schema(session: &dyn SchemaSession, op: &SchemaOp) -> Result<SchemaOutcome> {
    let Some(sql) = session.dialect().render(op)? else {
        return Ok(SchemaOutcome::NonSql);
    };
    if sql.is_empty() {
        return Ok(SchemaOutcome::Skipped);
    }

    if op.is_query() {
        let count = session
            .query_scalar(&format!("SELECT COUNT(*) FROM ({sql}) {EXISTS_ALIAS}"))
            .await?;
        let exists = count
            .and_then(|c| c.trim().parse::<i64>().ok())
            .is_some_and(|n| n > 0);
        return Ok(SchemaOutcome::Exists(exists));
    }

    let mut affected = 0;
    for statement in split_script(&sql) {
        debug!(sql = %statement, "Executing SQL");
        affected += session.execute(statement).await?;
    }
    Ok(SchemaOutcome::Executed(affected))
}

/// Splits a script on the statement separator, dropping blank statements.
#[must_use]
pub fn split_script(sql: &str) -> Vec<&str> {
    sql.split(STATEMENT_SEPARATOR)
        .map(str::trim)
        .map(|s| s.strip_suffix(';').unwrap_or(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// A statement that failed to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedStatement {
    pub sql: String,
    pub error: String,
}

/// What happened to one table during a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    /// Kinds of every operation the diff produced, in order.
    pub operations: Vec<SchemaOpKind>,
    /// Statements rendered for execution or review.
    pub statements: Vec<String>,
    /// Number of statements that ran successfully.
    pub applied: usize,
    pub failed: Vec<FailedStatement>,
    /// Destructive statements withheld by the no-delete guard.
    pub manual: Vec<String>,
    /// Operations the dialect performs outside SQL.
    pub non_sql: Vec<SchemaOpKind>,
}

impl TableReport {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Returns the rendered statements as one script.
    #[must_use]
    pub fn script(&self) -> String {
        join_script(&self.statements)
    }

    /// Returns `true` if the table needed no statements at all.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.statements.is_empty() && self.manual.is_empty()
    }
}

fn join_script(statements: &[String]) -> String {
    if statements.is_empty() {
        return String::new();
    }
    let mut script = statements.join(STATEMENT_SEPARATOR);
    script.push(';');
    script
}

/// Applies table diffs through a session.
pub struct SchemaExecutor<'a> {
    session: &'a dyn SchemaSession,
    dry_run: bool,
    no_delete: bool,
}

impl<'a> SchemaExecutor<'a> {
    /// Creates a new executor.
    pub fn new(session: &'a dyn SchemaSession) -> Self {
        Self {
            session,
            dry_run: false,
            no_delete: false,
        }
    }

    /// Enables dry-run mode (the script is logged but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Withholds destructive statements and logs them for manual execution.
    #[must_use]
    pub const fn no_delete(mut self, enabled: bool) -> Self {
        self.no_delete = enabled;
        self
    }

    /// Renders and applies every operation of `diff`.
    ///
    /// A failing statement is logged and recorded; the remaining statements
    /// still run. Only a rendering failure aborts the table.
    pub async fn apply(&self, diff: &TableDiff) -> Result<TableReport> {
        let dialect = self.session.dialect();
        let mut report = TableReport::new(&diff.table);

        for op in &diff.operations {
            report.operations.push(op.kind());
            let Some(sql) = dialect.render(op)? else {
                debug!(table = %diff.table, operation = %op.kind(), "Operation handled outside SQL");
                report.non_sql.push(op.kind());
                continue;
            };
            if sql.is_empty() {
                continue;
            }

            if self.no_delete && op.is_destructive() {
                warn!(
                    table = %diff.table,
                    sql = %sql,
                    "Destructive change withheld, run it manually"
                );
                report.manual.push(sql);
                continue;
            }

            if !self.dry_run {
                for statement in split_script(&sql) {
                    debug!(sql = %statement, "Executing SQL");
                    match self.session.execute(statement).await {
                        Ok(_) => report.applied += 1,
                        Err(e) => {
                            warn!(
                                table = %diff.table,
                                sql = %statement,
                                error = %e,
                                "Failed to apply schema change"
                            );
                            report.failed.push(FailedStatement {
                                sql: statement.to_string(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
            report.statements.push(sql);
        }

        if self.dry_run && !report.statements.is_empty() {
            info!(
                table = %diff.table,
                script = %report.script(),
                "Schema changes pending, not applied"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_scripts_on_the_separator() {
        assert_eq!(
            split_script("ALTER TABLE T ADD a INT;\nALTER TABLE T ADD b INT;\n"),
            ["ALTER TABLE T ADD a INT", "ALTER TABLE T ADD b INT"]
        );
        assert_eq!(split_script("DROP TABLE T"), ["DROP TABLE T"]);
        assert!(split_script(" ;\n ").is_empty());
    }

    #[test]
    fn statements_without_the_separator_stay_whole() {
        let batch = "DECLARE @n sysname\nSELECT @n = 1";
        assert_eq!(split_script(batch), [batch]);
    }

    #[test]
    fn report_script_is_semicolon_joined() {
        let mut report = TableReport::new("T");
        assert_eq!(report.script(), "");
        report.statements = vec!["A".to_string(), "B".to_string()];
        assert_eq!(report.script(), "A;\nB;");
        assert!(!report.is_converged());
    }
}
