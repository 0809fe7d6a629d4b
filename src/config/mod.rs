// src/config/mod.rs

//! Configuration loading and validation for pollwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the validated `WatchConfig` (`model.rs`).
//! - Merge CLI flags over an optional config file (`loader.rs`).
//! - Validate paths, durations and the command line (`validate.rs`).
//!
//! The result is one immutable `WatchConfig`, built once at startup and
//! passed by reference into the detector and the supervisor.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve};
pub use model::{CommandSection, CommandSpec, RawConfigFile, WatchConfig, WatchSection};
pub use validate::{parse_duration, resolve_root};
