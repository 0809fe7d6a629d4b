// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::{DeletionPolicy, ReadErrorPolicy};

/// Command-line arguments for `pollwatch`.
///
/// Every option except `--config` may also come from the config file; values
/// given here win.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "pollwatch",
    version,
    about = "Restart a command whenever files under a directory change.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to watch (recursively). Hidden entries are ignored.
    #[arg(long, value_name = "DIR")]
    pub path: Option<String>,

    /// Command to (re)start, e.g. "cargo run --bin server".
    ///
    /// Split on whitespace: the first word is the program, the rest are its
    /// arguments. No shell is involved.
    #[arg(long, value_name = "COMMAND")]
    pub cmd: Option<String>,

    /// Optional TOML config file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// How often the tree is re-walked, e.g. "500ms", "1s".
    #[arg(long, value_name = "DURATION")]
    pub interval: Option<String>,

    /// How long a stopped command may take to exit before it is killed.
    #[arg(long, value_name = "DURATION")]
    pub stop_timeout: Option<String>,

    /// Whether removing files restarts the command.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_delete: Option<DeletionPolicy>,

    /// What to do when a directory becomes unreadable while watching.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_read_error: Option<ReadErrorPolicy>,

    /// Wait for the first change instead of starting the command right away.
    #[arg(long)]
    pub skip_initial_run: bool,

    /// Pipe the command's output through the logger instead of the terminal.
    #[arg(long)]
    pub capture_output: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `POLLWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
