// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `jobdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobdag",
    version,
    about = "Run a plan of dependent jobs with bounded concurrency.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job plan (TOML).
    ///
    /// Default: `Jobs.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Jobs.toml")]
    pub plan: String,

    /// Override `[config].max_concurrent` from the plan file.
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the plan, but don't run any job.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
