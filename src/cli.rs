//! Command-line interface for declcheck.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{self, Config, DEFAULT_CONFIG_NAMES};
use crate::detect::Severity;
use crate::error::Error;
use crate::logger::TracingLogger;
use crate::operation::OperationOptions;
use crate::orchestrator::Orchestrator;
use crate::registry::OperationRegistry;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default config written by `declcheck init`.
const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");

/// Declaration-level static analysis and codemods for Go source trees.
///
/// Finds duplicated types, conflicting imports, naming problems,
/// unresolved type references and package import cycles. Import
/// conflicts can be rewritten in place with --force.
#[derive(Parser)]
#[command(name = "declcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether debug logging was requested.
    pub fn verbose(&self) -> bool {
        matches!(&self.command, Commands::Run(args) if args.verbose)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one analyzer over a directory or file
    Run(RunArgs),
    /// List available operations
    List,
    /// Write a default config file
    Init(InitArgs),
}

/// Arguments for the run command.
#[derive(Parser)]
pub struct RunArgs {
    /// Operation id (see `declcheck list`)
    pub operation: String,

    /// Path to analyze (file or directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Apply auto-fixes
    #[arg(long)]
    pub force: bool,

    /// Report only; never modify files or write the report file
    #[arg(long)]
    pub dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Abort the walk after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Threads used to parse files
    #[arg(short, long, default_value_t = 1)]
    pub workers: usize,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Exit non-zero when a finding at or above this severity exists
    #[arg(long, default_value = "high")]
    pub fail_on: String,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "declcheck.yaml")]
    pub output: PathBuf,
}

/// Dispatch a parsed command line and return the exit code.
pub fn run(cli: Cli) -> i32 {
    let result = match &cli.command {
        Commands::Run(args) => run_operation(args),
        Commands::List => run_list(),
        Commands::Init(args) => run_init(args),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    }
}

/// Load the config named on the command line, or the one found next to
/// the analyzed tree.
fn load_config(explicit: Option<&Path>, base_dir: &Path) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Config::discover(base_dir),
    };
    let config = match path {
        Some(p) => {
            tracing::debug!("using config {}", p.display());
            Config::parse_file(&p)
                .map_err(|e| anyhow::anyhow!("cannot load config {}: {}", p.display(), e))?
        }
        None => Config::default(),
    };
    config::validate(&config)?;
    Ok(config)
}

/// Run the run command.
pub fn run_operation(args: &RunArgs) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let fail_on: Severity = match args.fail_on.parse() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    // Resolve path
    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let base_dir = if abs_path.is_dir() {
        abs_path.clone()
    } else {
        abs_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    let config = match load_config(args.config.as_deref(), &base_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'declcheck init' to create a config file");
            return Ok(EXIT_ERROR);
        }
    };

    let mut orchestrator = Orchestrator::new(OperationRegistry::with_builtins())
        .with_base_dir(&base_dir)
        .with_logger(Arc::new(TracingLogger))
        .with_config(config);

    let options = OperationOptions {
        target: Some(abs_path),
        output: args.output.clone(),
        force: args.force,
        dry_run: args.dry_run,
        verbose: args.verbose,
        timeout: args.timeout.map(Duration::from_secs),
        workers: args.workers,
    };

    let outcome = match orchestrator.execute(&args.operation, &options) {
        Ok(o) => o,
        Err(Error::Cancelled) => {
            eprintln!("Error: run cancelled before completion; no report written");
            return Ok(EXIT_ERROR);
        }
        Err(Error::Registry(e)) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'declcheck list' to see available operations");
            return Ok(EXIT_ERROR);
        }
        Err(e) => return Err(e.into()),
    };

    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&outcome.report)?,
        _ => report::write_pretty(&outcome.report, &path_str),
    }

    // Return appropriate exit code
    if outcome.report.has_findings_at(fail_on) {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the list command.
pub fn run_list() -> anyhow::Result<i32> {
    let registry = OperationRegistry::with_builtins();

    println!("Available operations:");
    println!();
    for id in registry.list() {
        let description = registry.get(&id)?.describe();
        let text = description
            .strip_prefix(&format!("{}: ", id))
            .unwrap_or(&description)
            .to_string();
        println!("  {:<20} {}", id, text);
    }
    println!();
    println!("Usage:");
    println!("  declcheck run <operation> [path]");

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, DEFAULT_TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize for your project", args.output.display());
    println!(
        "  2. Keep it next to your sources as one of: {}",
        DEFAULT_CONFIG_NAMES.join(", ")
    );
    println!("  3. Run: declcheck run duplicate-types .");

    Ok(EXIT_SUCCESS)
}
