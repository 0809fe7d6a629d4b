// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::cli::CliArgs;
use crate::config::model::{
    CommandSpec, RawConfigFile, WatchConfig, DEFAULT_INTERVAL, DEFAULT_STOP_TIMEOUT,
};
use crate::config::validate::{positive_duration, resolve_root};
use crate::errors::{PollwatchError, Result};
use crate::types::OutputMode;

/// Load a config file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; see [`resolve`] for validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Build the runtime configuration from CLI arguments.
///
/// Reads `--config` if given, then lets every flag override the file.
/// Relative watch paths resolve against the current working directory.
pub fn load_and_validate(args: &CliArgs) -> Result<WatchConfig> {
    let raw = match &args.config {
        Some(path) => load_from_path(path)?,
        None => RawConfigFile::default(),
    };
    let cwd = std::env::current_dir()?;
    resolve(args, raw, &cwd)
}

/// Merge `args` over `raw` and validate the result.
pub fn resolve(args: &CliArgs, raw: RawConfigFile, cwd: &Path) -> Result<WatchConfig> {
    let RawConfigFile { watch, command } = raw;

    let path = args.path.clone().or(watch.path).ok_or_else(|| {
        PollwatchError::Config("missing watch path (use --path or [watch].path)".to_string())
    })?;
    let root = resolve_root(&path, cwd)?;

    let raw_cmd = args.cmd.clone().or(command.cmd).ok_or_else(|| {
        PollwatchError::Config("missing command (use --cmd or [command].cmd)".to_string())
    })?;
    let command_spec = CommandSpec::parse(&raw_cmd)?;

    let interval = match args.interval.as_deref().or(watch.interval.as_deref()) {
        Some(s) => positive_duration("interval", s)?,
        None => DEFAULT_INTERVAL,
    };
    let stop_timeout = match args.stop_timeout.as_deref().or(command.stop_timeout.as_deref()) {
        Some(s) => positive_duration("stop_timeout", s)?,
        None => DEFAULT_STOP_TIMEOUT,
    };

    let output = if args.capture_output || command.capture_output.unwrap_or(false) {
        OutputMode::Capture
    } else {
        OutputMode::Inherit
    };

    let initial_run = !args.skip_initial_run && command.initial_run.unwrap_or(true);

    Ok(WatchConfig {
        root,
        interval,
        deletion: args.on_delete.or(watch.on_delete).unwrap_or_default(),
        read_errors: args.on_read_error.or(watch.on_read_error).unwrap_or_default(),
        command: command_spec,
        stop_timeout,
        output,
        initial_run,
    })
}
