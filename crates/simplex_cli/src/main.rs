//! `simplex` command-line entry point.
//!
//! # Responsibility
//! - Compile manifest directories and print or persist the registry.
//! - Run one registered task against the builtin library.
//!
//! # Invariants
//! - Registry JSON goes to stdout; logs and user notices go to stderr.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use simplex_core::{
    builtin_loader, compile_tasks, init_logging, CompileOptions, HostDisplay, SimplexConfig,
    SubmissionOutcome, TaskManager,
};
use std::path::PathBuf;

/// Compile SimpleX task manifests and run tasks.
#[derive(Parser)]
#[command(name = "simplex")]
#[command(about = "Compile SimpleX task manifests and run tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every manifest into one registry and print it
    Compile {
        /// Manifest directory (overrides SIMPLEX_JSON_DIR)
        #[arg(long)]
        json_dir: Option<PathBuf>,

        /// Record file to write (overrides SIMPLEX_TASK_RECORD_FILEPATH)
        #[arg(long, conflicts_with = "no_record")]
        record: Option<PathBuf>,

        /// Do not persist the compiled record
        #[arg(long)]
        no_record: bool,
    },

    /// List registered task labels with their function paths
    Tasks {
        /// Manifest directory (overrides SIMPLEX_JSON_DIR)
        #[arg(long)]
        json_dir: Option<PathBuf>,
    },

    /// Run one task against the builtin library
    Run {
        /// Task label as listed by `simplex tasks`
        label: String,

        /// Manifest directory (overrides SIMPLEX_JSON_DIR)
        #[arg(long)]
        json_dir: Option<PathBuf>,

        /// Argument value, repeatable
        #[arg(long = "arg", value_name = "NAME=VALUE", value_parser = parse_binding)]
        args: Vec<(String, String)>,

        /// Variable name for each return slot, in order
        #[arg(long = "ret", value_name = "NAME")]
        returns: Vec<String>,
    },
}

/// Prints host notices on stderr.
struct TerminalHost;

impl HostDisplay for TerminalHost {
    fn clear_output(&mut self) {}

    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SimplexConfig::from_env().context("failed to read configuration")?;
    init_logging(&config.logging).map_err(|err| anyhow!("failed to start logging: {err}"))?;
    info!(
        "event=cli_start module=cli status=ok json_dir={}",
        config.json_dir.display()
    );

    match cli.command {
        Commands::Compile {
            json_dir,
            record,
            no_record,
        } => {
            let mut options = options_for(&config, json_dir);
            if !no_record {
                options.record_path = Some(record.unwrap_or_else(|| config.record_path.clone()));
            }
            let registry = compile_tasks(&options)?;
            println!("{}", registry.to_json_pretty()?);
        }
        Commands::Tasks { json_dir } => {
            let registry = compile_tasks(&options_for(&config, json_dir))?;
            for (label, task) in &registry {
                println!("{label}\t{}", task.function_path());
            }
        }
        Commands::Run {
            label,
            json_dir,
            args,
            returns,
        } => run_task(&config, json_dir, &label, &args, returns)?,
    }
    Ok(())
}

/// Compile options without a record; only `compile` persists.
fn options_for(config: &SimplexConfig, json_dir: Option<PathBuf>) -> CompileOptions {
    CompileOptions::new(json_dir.unwrap_or_else(|| config.json_dir.clone()))
}

fn run_task(
    config: &SimplexConfig,
    json_dir: Option<PathBuf>,
    label: &str,
    args: &[(String, String)],
    returns: Vec<String>,
) -> Result<()> {
    let options = options_for(config, json_dir);
    let mut manager = TaskManager::compile(&options, builtin_loader(), TerminalHost)?;
    let mut payload = manager
        .payload_for(label)
        .ok_or_else(|| anyhow!("no task labelled `{label}`"))?;
    for (name, value) in args {
        if !payload.set_arg(name, value.as_str()) {
            bail!("task `{label}` has no argument `{name}`");
        }
    }
    if !returns.is_empty() {
        payload.set_returns(returns);
    }

    match manager.submit(&payload)? {
        SubmissionOutcome::Rejected(issue) => bail!("{}", issue.message()),
        SubmissionOutcome::Completed(report) => {
            for name in &report.bound {
                if let Some(value) = manager.namespace().get(name) {
                    println!("{name} = {value}");
                }
            }
            if report.bound.is_empty() {
                println!("{}", report.result);
            }
        }
    }
    Ok(())
}

fn parse_binding(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}
