// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Compile an asset tree through a set of processors and emit manifests.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Assetpipe.toml")]
    pub config: String,

    /// Compile this file or directory instead of the configured `entry`.
    #[arg(long, value_name = "PATH")]
    pub entry: Option<PathBuf>,

    /// Keep running and print a new manifest after every change.
    #[arg(long)]
    pub watch: bool,

    /// Watch by polling modification times, optionally every MS
    /// milliseconds, instead of using native notifications.
    #[arg(long, value_name = "MS", num_args = 0..=1)]
    pub poll: Option<Option<u64>>,

    /// Stop watching on the first error.
    #[arg(long)]
    pub strict: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the processors, but don't compile anything.
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
