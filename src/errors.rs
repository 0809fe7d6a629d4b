// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("command is empty")]
    EmptyCommand,

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// The watched root could not be walked at startup; nothing can be
    /// watched without a complete first snapshot.
    #[error("initial walk of {path:?} failed: {source}")]
    InitialWalk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory became unreadable mid-run under `ReadErrorPolicy::Fail`.
    #[error("reading {path:?} failed: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PollwatchError>;
