//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// prodlog -- demultiplex and summarize Rails production logs.
///
/// Use `prodlog <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "prodlog", version, about, long_about = None)]
pub struct Cli {
    /// Path to the prodlog.toml configuration file (optional; defaults apply if missing).
    #[arg(short, long, global = true, default_value = "prodlog.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the raw lines of completed requests handled by an action.
    Grep(GrepArgs),

    /// Print one summary per request found in a log file.
    Parse(ParseArgs),

    /// Aggregate request timings per normalized page.
    Report(ReportArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- grep ----

/// Grep a log file for one controller action.
#[derive(Args, Debug)]
pub struct GrepArgs {
    /// `SomeController#action`, `SomeController`, a URL such as `messages/just_now`, or `all`.
    pub action: String,

    /// Log file to read.
    pub file: PathBuf,
}

// ---- parse ----

/// Parse every request in a log file.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Log file to read.
    pub file: PathBuf,

    /// Include per-query timings in text output.
    #[arg(short, long)]
    pub queries: bool,
}

// ---- report ----

/// Summarize request timings per page.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Log file to read.
    pub file: PathBuf,

    /// Show only the N slowest pages (by total request time).
    #[arg(long)]
    pub top: Option<usize>,
}

// ---- config ----

/// Manage prodlog configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show,
}
