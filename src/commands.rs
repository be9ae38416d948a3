//! Command-line interface definition for snaplink.
//!
//! This module defines the CLI arguments and the handlers that turn them into
//! a backup run or a configuration report.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::application::{self, Settings};
use crate::constants::{SOURCE_DELIMITER, SOURCES_ENV, STORAGE_ENV};
use crate::orchestrator::Orchestrator;
use crate::report::StdoutReporter;
use crate::sysexits;

/// Command-line interface definition for snaplink.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute. Defaults to `run`.
    #[command(subcommand)]
    pub commands: Option<Commands>,

    #[command(flatten)]
    pub args: RunArgs,
}

/// Supported snaplink commands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Back up every source root into a new snapshot.
    Run,
    /// Display the configuration file path and the effective settings.
    Config,
}

/// Options shared by all commands.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Source directories to back up, separated by ';'.
    #[arg(short, long, global = true, env = SOURCES_ENV, value_delimiter = SOURCE_DELIMITER, value_name = "PATHS")]
    pub source: Vec<String>,
    /// Directory the backup roots live in. Defaults to the home directory.
    #[arg(short = 'd', long, global = true, env = STORAGE_ENV, value_name = "DIR")]
    pub storage: Option<PathBuf>,
    /// Only back up files directly inside each source root.
    #[arg(long, global = true)]
    pub no_recursive: bool,
    /// Print a line for every copied or linked file.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Decide and report everything, but write nothing.
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,
    /// Use this config file instead of the default one.
    #[arg(long = "config", global = true, value_name = "FILE")]
    pub config_file: Option<PathBuf>,
}

/// Runs the selected command and returns the process exit status.
///
/// # Errors
/// Returns an error if the configuration is unusable or a backup hits a
/// fatal error.
pub fn execute(cli: Cli) -> Result<i32> {
    match cli.commands.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli.args),
        Commands::Config => {
            config(&cli.args)?;
            Ok(sysexits::EX_OK)
        }
    }
}

/// Backs up all configured source roots.
///
/// Prints a hint and succeeds without touching the filesystem when no source
/// is configured.
///
/// # Errors
/// Returns an error if the config file is broken or a root hits a fatal
/// error.
pub fn run(args: &RunArgs) -> Result<i32> {
    let settings = load_settings(args)?;
    let sources = settings.sources(&args.source);
    if sources.is_empty() {
        println!("Set {SOURCES_ENV}");
        return Ok(sysexits::EX_OK);
    }

    let config = settings.backup_config(args)?;
    let reporter = Arc::new(StdoutReporter::new(config.verbose));
    let orchestrator = Orchestrator::new(config, reporter)?;
    let summary = orchestrator.run(&sources).context("Backup aborted")?;

    let failed = summary.failed();
    if failed > 0 {
        eprintln!("{failed} file(s) were not backed up.");
        return Ok(sysexits::EX_IOERR);
    }
    Ok(sysexits::EX_OK)
}

/// Prints the config file location and the settings a run would use.
///
/// # Errors
/// Returns an error if the config file cannot be read or parsed.
pub fn config(args: &RunArgs) -> Result<()> {
    match config_path(args) {
        Some(path) => {
            let state = if path.exists() { "" } else { " (not found)" };
            println!("config file: {}{state}", path.display());
        }
        None => println!("config file: <none>"),
    }

    let settings = load_settings(args)?;
    let sources = settings.sources(&args.source);
    if sources.is_empty() {
        println!("sources: <none>");
    } else {
        println!("sources:");
        for source in &sources {
            println!("    {}", source.display());
        }
    }
    match settings.backup_config(args) {
        Ok(config) => {
            println!("storage: {}", config.storage_root.display());
            println!("recursive: {}", config.recursive);
        }
        Err(e) => println!("storage: <unset> ({e})"),
    }
    Ok(())
}

fn config_path(args: &RunArgs) -> Option<PathBuf> {
    args.config_file.clone().or_else(application::config_file)
}

fn load_settings(args: &RunArgs) -> Result<Settings> {
    match config_path(args) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Unable to load settings from '{}'", path.display())),
        None => Ok(Settings::default()),
    }
}
