// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `CommandRunner` trait the supervisor launches
//!   through, so tests can swap in a fake.
//! - [`process`] is the real runner: `tokio::process`, its own process group,
//!   polite stop then forced kill, optional output capture.

pub mod backend;
pub mod process;

pub use backend::CommandRunner;
pub use process::ProcessRunner;
