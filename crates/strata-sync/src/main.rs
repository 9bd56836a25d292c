//! strata-sync CLI
//!
//! Command-line tool for reconciling, exporting and diffing database schemas.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use strata_core::{SchemaOpKind, Tables, TableDiff, diff_schema, dialect_by_name, page_split_sql};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use strata_sync::config::parse_exclude;
use strata_sync::probe::observe_schema;
use strata_sync::{SchemaSync, SqliteSession, StaticCatalog, SyncConfig, SyncError, SyncMode};

/// Keeps a live database schema in step with a declared model.
#[derive(Parser)]
#[command(name = "strata-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:strata.db")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the database with a declared model.
    Sync {
        /// Declared model (XML export).
        #[arg(short, long)]
        model: PathBuf,

        /// off, log-only or apply. Overrides STRATA_SCHEMA_SYNC.
        #[arg(long, value_parser = parse_mode)]
        mode: Option<SyncMode>,

        /// Log destructive statements instead of running them.
        #[arg(long)]
        no_delete: bool,

        /// Comma or semicolon separated table names to skip.
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Snapshot the database schema to an XML file.
    Export {
        /// Output file.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Diff two schema snapshots offline and print the DDL.
    Diff {
        /// Declared model (XML export).
        #[arg(long)]
        declared: PathBuf,

        /// Observed schema (XML export).
        #[arg(long)]
        observed: PathBuf,

        /// Target dialect.
        #[arg(long, default_value = "sqlite")]
        dialect: String,

        /// Print a JSON report instead of a script.
        #[arg(long)]
        json: bool,
    },

    /// Print the paginated form of a query.
    Page {
        /// Target dialect.
        #[arg(long, default_value = "sqlite")]
        dialect: String,

        /// The SELECT statement to page.
        #[arg(long)]
        sql: String,

        /// Rows to skip.
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Rows to return (0 for all remaining).
        #[arg(long, default_value_t = 0)]
        max: u64,

        /// Key column, optionally suffixed with asc, desc or unknown.
        #[arg(long)]
        key: Option<String>,
    },
}

fn parse_mode(value: &str) -> Result<SyncMode, String> {
    value.parse().map_err(|e: SyncError| e.to_string())
}

#[derive(Serialize)]
struct DiffReport<'a> {
    table: &'a str,
    operations: Vec<OperationReport>,
}

#[derive(Serialize)]
struct OperationReport {
    kind: SchemaOpKind,
    sql: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = SyncConfig::from_env()?;

    // Setup logging
    let log_level = if cli.verbose || config.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Sync {
            model,
            mode,
            no_delete,
            exclude,
        } => {
            if let Some(mode) = mode {
                config.mode = mode;
            }
            config.no_delete |= no_delete;
            if let Some(exclude) = exclude {
                config.exclude.extend(parse_exclude(&exclude));
            }
            if !config.mode.is_enabled() {
                warn!("Schema sync is off. Pass --mode or set STRATA_SCHEMA_SYNC.");
                return Ok(());
            }

            let model = Tables::load(&model)
                .with_context(|| format!("Failed to load model {}", model.display()))?;
            let session = SqliteSession::connect(&cli.database).await?;
            let sync = SchemaSync::new(
                Arc::new(session),
                Arc::new(StaticCatalog::from(model)),
                config,
            );
            let report = sync.reconcile_all().await?;

            if report.mode == SyncMode::LogOnly {
                for table in &report.tables {
                    if !table.statements.is_empty() {
                        println!("{}", table.script());
                    }
                }
            }
            for table in &report.tables {
                for sql in &table.manual {
                    println!("{sql};");
                }
            }
            if report.is_converged() {
                info!("Schema is up to date.");
            }
            if report.failure_count() > 0 {
                anyhow::bail!("{} schema statements failed", report.failure_count());
            }
        }

        Commands::Export { output } => {
            let session = SqliteSession::connect(&cli.database).await?;
            let observed = observe_schema(&session, &config).await?;
            for name in &observed.unresolved {
                warn!(table = %name, "Table left out of the export");
            }
            let count = observed.tables.len();
            Tables::new(observed.tables).save(&output)?;
            info!(tables = count, path = %output.display(), "Schema exported");
        }

        Commands::Diff {
            declared,
            observed,
            dialect,
            json,
        } => {
            let target = dialect_by_name(&dialect)
                .with_context(|| format!("Unknown dialect: {dialect}"))?;
            let declared = Tables::load(&declared)?;
            let observed = Tables::load(&observed)?;
            let diffs = diff_schema(&declared.tables, &observed.tables, target);

            if json {
                let reports = diffs
                    .iter()
                    .map(|diff| diff_report(diff, target))
                    .collect::<Result<Vec<_>, _>>()?;
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for diff in &diffs {
                    for op in &diff.operations {
                        match target.render(op)? {
                            Some(sql) if !sql.is_empty() => println!("{sql};"),
                            Some(_) => {}
                            None => println!("-- {} is applied outside SQL", op.kind()),
                        }
                    }
                }
            }
        }

        Commands::Page {
            dialect,
            sql,
            offset,
            max,
            key,
        } => {
            let target = dialect_by_name(&dialect)
                .with_context(|| format!("Unknown dialect: {dialect}"))?;
            println!("{}", page_split_sql(target, &sql, offset, max, key.as_deref())?);
        }
    }

    Ok(())
}

fn diff_report<'a>(
    diff: &'a TableDiff,
    target: &dyn strata_core::Dialect,
) -> Result<DiffReport<'a>, strata_core::DdlError> {
    let operations = diff
        .operations
        .iter()
        .map(|op| {
            Ok(OperationReport {
                kind: op.kind(),
                sql: target.render(op)?,
            })
        })
        .collect::<Result<Vec<_>, strata_core::DdlError>>()?;
    Ok(DiffReport {
        table: &diff.table,
        operations,
    })
}
