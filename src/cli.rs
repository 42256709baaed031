// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `depwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "depwatch",
    version,
    about = "Bundle test entries and rebuild them when anything they depend on changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Depwatch.toml")]
    pub config: String,

    /// Bundle every entry once and exit (overrides `[config].single_run`).
    #[arg(long)]
    pub single_run: bool,

    /// Same as `auto_watch = false`: bundle once, never watch.
    #[arg(long)]
    pub no_watch: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEPWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config, print the resolved entries, bundle nothing.
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
