//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `analyze`: Topology, distribution, and health report for the whole schema
//! - `summary`: Objects ranked by coupling, with a risk label
//! - `impact`: What breaks if one object is dropped or changed
//! - `cycles`: Circular dependencies
//! - `trace`: Timing and buffer statistics of an `EXPLAIN` plan
//!
//! # Global Flags
//!
//! - `--snapshot <file>`: Schema snapshot (required by the graph commands)
//! - `--config <file>`: Analysis thresholds (defaults to `.dbgraph.yaml` if present)
//! - `--json`: Output in JSON format
//! - `-v`: Verbosity (repeatable)
//!
//! # Example
//!
//! ```bash
//! dbgraph --snapshot schema.json analyze
//! dbgraph --snapshot schema.json impact users
//! dbgraph --snapshot schema.json summary --limit 20
//! dbgraph trace plan.json
//! ```

pub mod analyze;
pub mod cycles;
mod display;
pub mod impact;
pub mod summary;
pub mod trace;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use dbgraph_core::{AnalysisConfig, Graph, SchemaSnapshot};

use crate::output::{OutputConfig, OutputMode};

/// Rows shown by `summary` unless `--limit` or `--all` is given.
pub const DEFAULT_SUMMARY_LIMIT: usize = 10;

/// dbgraph - Answer "what breaks if I change this?" for a database schema
///
/// Loads a schema snapshot (tables, views, triggers, foreign keys, view
/// dependencies, inheritance) into a dependency graph and analyzes it.
#[derive(Parser, Debug)]
#[command(name = "dbgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Schema snapshot JSON file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Analysis config YAML file (defaults to .dbgraph.yaml in the current directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Topology, object distribution, and schema health report
    Analyze,

    /// Rank objects by coupling (fan-in plus fan-out)
    Summary {
        /// Number of rows to show
        #[arg(short, long, conflicts_with = "all")]
        limit: Option<usize>,

        /// Show every object
        #[arg(long)]
        all: bool,
    },

    /// Show everything that depends on an object, directly or transitively
    Impact {
        /// Object id (`schema.name`) or bare name
        target: String,
    },

    /// Detect circular dependencies
    Cycles,

    /// Summarize an `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)` plan
    Trace {
        /// Plan JSON file
        plan: PathBuf,
    },
}

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    /// Snapshot path from `--snapshot`
    pub snapshot: Option<PathBuf>,
    /// Analyzer thresholds
    pub analysis: AnalysisConfig,
    /// Terminal settings
    pub output: OutputConfig,
    /// Text or JSON
    pub mode: OutputMode,
}

impl Context {
    /// Load the snapshot and build the dependency graph.
    ///
    /// # Errors
    ///
    /// Fails if no snapshot was given or it cannot be loaded.
    pub fn graph(&self) -> Result<Graph> {
        let path = self
            .snapshot
            .as_deref()
            .context("no schema snapshot given (use --snapshot <FILE>)")?;
        let snapshot = SchemaSnapshot::load(path)
            .with_context(|| format!("failed to load schema snapshot {}", path.display()))?;
        Ok(snapshot.build_graph())
    }
}

impl Cli {
    /// Parse command-line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the command context from global flags and the environment.
    ///
    /// # Errors
    ///
    /// Fails if the config file cannot be read or is invalid.
    pub fn context(&self, cwd: &Path) -> Result<Context> {
        let analysis = match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => AnalysisConfig::discover(cwd).context("failed to load .dbgraph.yaml")?,
        };

        Ok(Context {
            snapshot: self.snapshot.clone(),
            analysis,
            output: OutputConfig::from_env(),
            mode: if self.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            },
        })
    }

    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns the first failure from loading inputs or writing output.
    pub fn execute(&self) -> Result<()> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let ctx = self.context(&cwd)?;
        tracing::debug!(command = ?self.command, mode = ?ctx.mode, "Executing command");

        match &self.command {
            Commands::Analyze => analyze::run(&ctx),
            Commands::Summary { limit, all } => {
                let limit = if *all {
                    None
                } else {
                    Some(limit.unwrap_or(DEFAULT_SUMMARY_LIMIT))
                };
                summary::run(&ctx, limit)
            }
            Commands::Impact { target } => impact::run(&ctx, target),
            Commands::Cycles => cycles::run(&ctx),
            Commands::Trace { plan } => trace::run(&ctx, plan),
        }
    }
}
