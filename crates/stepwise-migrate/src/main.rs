//! stepwise CLI
//!
//! Command-line tool for planning forward-only migration steps.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use stepwise_migrate::naming::parse_timestamp;
use stepwise_migrate::prelude::*;

/// Phase-ordered step splitting for forward-only schema migrations.
#[derive(Parser)]
#[command(name = "stepwise")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Order a batch of schema operations into numbered steps.
    Plan {
        /// JSON file with the list of operations.
        #[arg(short, long)]
        operations: PathBuf,

        /// Snapshot of the schema before the change (annotates drops).
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Snapshot of the schema after the change (annotates creates).
        #[arg(long)]
        current: Option<PathBuf>,

        /// Change-set name. When set, every step gets an identifier.
        #[arg(short, long, env = "STEPWISE_CHANGESET")]
        changeset: Option<String>,

        /// Run timestamp as YYYYMMDDHHMMSS (defaults to now, UTC).
        #[arg(long, value_parser = parse_timestamp)]
        timestamp: Option<NaiveDateTime>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Fail instead of warning when derived tables depend on each other
        /// in a cycle.
        #[arg(long, env = "STEPWISE_STRICT_CYCLES")]
        strict_cycles: bool,

        /// Skip the annotation audit.
        #[arg(long)]
        no_audit: bool,

        /// Write the resulting schema snapshot to this file.
        #[arg(long)]
        save_snapshot: Option<PathBuf>,
    },

    /// Print the tables a SELECT query reads from.
    Tables {
        /// The query text.
        sql: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<&'a GenerationRun>,
    #[serde(flatten)]
    plan: &'a SplitPlan,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Plan {
            operations,
            previous,
            current,
            changeset,
            timestamp,
            format,
            strict_cycles,
            no_audit,
            save_snapshot,
        } => {
            let content = fs::read_to_string(&operations)
                .with_context(|| format!("reading {}", operations.display()))?;
            let ops: Vec<Operation> = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", operations.display()))?;
            info!("Loaded {} operations", ops.len());

            let previous = match &previous {
                Some(path) => JsonSnapshotRepository::new(path).load_previous()?,
                None => None,
            };
            let current = current.as_deref().map(read_snapshot).transpose()?;
            let next_snapshot = current.clone().unwrap_or_else(|| {
                previous.clone().unwrap_or_default().apply(&ops)
            });

            let ops = enrich_annotations(ops, previous.as_ref(), current.as_ref());

            let mut options = SplitOptions::new();
            if strict_cycles {
                options = options.strict();
            }
            if no_audit {
                options = options.without_audit();
            }
            let plan = StepSplitter::new(options).split(ops)?;

            let run = match changeset {
                Some(name) => {
                    let steps = plan.steps.clone();
                    let run = match timestamp {
                        Some(ts) => GenerationRun::new(&name, ts, steps)?,
                        None => GenerationRun::now(&name, steps)?,
                    };
                    Some(run.with_snapshot(next_snapshot.clone()))
                }
                None => None,
            };

            match format {
                OutputFormat::Json => {
                    let report = PlanReport {
                        run: run.as_ref(),
                        plan: &plan,
                    };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Text => print_plan(&plan, run.as_ref()),
            }

            if let Some(path) = save_snapshot {
                JsonSnapshotRepository::new(&path).save(&next_snapshot)?;
                info!("Snapshot written to {}", path.display());
            }
        }

        Commands::Tables { sql } => match stepwise_sql::try_extract_table_references(&sql) {
            Ok(tables) => {
                for table in tables {
                    println!("{table}");
                }
            }
            Err(err) => warn!("Query could not be parsed: {err}"),
        },
    }

    Ok(())
}

fn read_snapshot(path: &Path) -> anyhow::Result<SchemaSnapshot> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(snapshot)
}

fn print_plan(plan: &SplitPlan, run: Option<&GenerationRun>) {
    if plan.steps.is_empty() {
        info!("Nothing to do.");
        return;
    }

    println!("\nPlanned steps:");
    println!("{:-<60}", "");
    match run {
        Some(run) => {
            for identified in run.steps() {
                let step = identified.step();
                println!(
                    " {:>4}  {}  {}  [{}]",
                    step.step_number,
                    identified.id(),
                    step.description,
                    step.phase
                );
            }
        }
        None => {
            for step in &plan.steps {
                println!(
                    " {:>4}  {}  [{}]",
                    step.step_number, step.description, step.phase
                );
            }
        }
    }
    println!();

    for unresolved in &plan.unresolved {
        println!(
            " ! {} could not be ordered ({}), waiting on: {}",
            unresolved.table,
            unresolved.phase,
            unresolved.waiting_on.join(", ")
        );
    }
}
