use clap::ValueEnum;
use serde::Deserialize;

/// What a poll cycle does with paths that were present last cycle but are
/// gone now.
///
/// - `Restart`: a removal counts as a change and restarts the command
///   (default).
/// - `Ignore`: removals are pruned from the snapshot silently; only added or
///   modified entries restart the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPolicy {
    Ignore,
    Restart,
}

impl Default for DeletionPolicy {
    fn default() -> Self {
        DeletionPolicy::Restart
    }
}

/// What a poll cycle does when a directory cannot be read after startup.
///
/// The initial walk ignores this and always fails hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReadErrorPolicy {
    /// Stop watching and exit non-zero.
    Fail,
    /// Log a warning, keep the last known state of that subtree, carry on.
    Skip,
}

impl Default for ReadErrorPolicy {
    fn default() -> Self {
        ReadErrorPolicy::Skip
    }
}

/// Where the supervised command's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Child shares our terminal.
    Inherit,
    /// Child output is piped and forwarded line by line through `tracing`.
    Capture,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Inherit
    }
}
