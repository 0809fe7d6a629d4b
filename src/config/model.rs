// src/config/model.rs

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{PollwatchError, Result};
use crate::types::{DeletionPolicy, OutputMode, ReadErrorPolicy};

/// Config file as read from TOML.
///
/// ```toml
/// [watch]
/// path = "src"
/// interval = "500ms"
/// on_delete = "ignore"
/// on_read_error = "fail"
///
/// [command]
/// cmd = "cargo run --bin server"
/// stop_timeout = "3s"
/// capture_output = true
/// initial_run = false
/// ```
///
/// Every key is optional; the CLI fills in or overrides whatever is missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub command: CommandSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Root directory; relative paths resolve against the working directory.
    pub path: Option<String>,
    /// Poll interval, e.g. `"1s"`.
    pub interval: Option<String>,
    pub on_delete: Option<DeletionPolicy>,
    pub on_read_error: Option<ReadErrorPolicy>,
}

/// `[command]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSection {
    pub cmd: Option<String>,
    pub stop_timeout: Option<String>,
    pub capture_output: Option<bool>,
    /// Start the command once right after the initial walk (default `true`).
    pub initial_run: Option<bool>,
}

/// Program plus arguments, split once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Split a raw command line on whitespace.
    ///
    /// The first word is the program. Runs of whitespace collapse, so
    /// `"go  build"` has no empty argument. No quoting rules apply.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut words = raw.split_whitespace().map(str::to_string);
        let program = words.next().ok_or(PollwatchError::EmptyCommand)?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Absolute, existing directory.
    pub root: PathBuf,
    pub interval: Duration,
    pub deletion: DeletionPolicy,
    pub read_errors: ReadErrorPolicy,
    pub command: CommandSpec,
    pub stop_timeout: Duration,
    pub output: OutputMode,
    pub initial_run: bool,
}

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);
