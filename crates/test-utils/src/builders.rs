#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pollwatch::config::{CommandSpec, WatchConfig};
use pollwatch::types::{DeletionPolicy, OutputMode, ReadErrorPolicy};
use tempfile::TempDir;

/// Builder for `WatchConfig` with test-friendly defaults:
/// a short poll interval, a short stop timeout, captured output and no
/// initial run.
pub struct WatchConfigBuilder {
    config: WatchConfig,
}

impl WatchConfigBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            config: WatchConfig {
                root: root.into(),
                interval: Duration::from_millis(50),
                deletion: DeletionPolicy::default(),
                read_errors: ReadErrorPolicy::default(),
                command: CommandSpec::parse("true").expect("valid command"),
                stop_timeout: Duration::from_millis(500),
                output: OutputMode::Capture,
                initial_run: false,
            },
        }
    }

    pub fn cmd(mut self, raw: &str) -> Self {
        self.config.command = CommandSpec::parse(raw).expect("valid command");
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.config.stop_timeout = timeout;
        self
    }

    pub fn deletion(mut self, policy: DeletionPolicy) -> Self {
        self.config.deletion = policy;
        self
    }

    pub fn read_errors(mut self, policy: ReadErrorPolicy) -> Self {
        self.config.read_errors = policy;
        self
    }

    pub fn initial_run(mut self, val: bool) -> Self {
        self.config.initial_run = val;
        self
    }

    pub fn build(self) -> WatchConfig {
        self.config
    }
}

/// A directory tree in a fresh temp dir, removed on drop.
pub struct TreeBuilder {
    dir: TempDir,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Create a directory (and its parents).
    pub fn dir(self, rel: &str) -> Self {
        self.mkdir(rel);
        self
    }

    /// Create a file (and its parents) with the given contents.
    pub fn file(self, rel: &str, contents: &str) -> Self {
        self.write(rel, contents);
        self
    }

    pub fn mkdir(&self, rel: &str) {
        fs::create_dir_all(self.path(rel)).expect("create dir");
    }

    /// Write (or overwrite) a file while the test is running.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write file");
    }

    pub fn remove(&self, rel: &str) {
        let path = self.path(rel);
        if path.is_dir() {
            fs::remove_dir_all(&path).expect("remove dir");
        } else {
            fs::remove_file(&path).expect("remove file");
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
