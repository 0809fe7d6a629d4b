// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The supervisor talks to a `CommandRunner` instead of spawning processes
//! itself. Production uses [`super::process::ProcessRunner`]; tests can plug
//! in a runner that records launches and never touches the OS.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::CommandSpec;
use crate::engine::{LaunchId, RunOutcome};

/// Runs one launch of the command to completion.
///
/// The returned future must resolve once the child is gone:
/// - on natural exit, with `Success`/`Failed`
/// - when `scope` is cancelled, after stopping the child, with `Stopped`
/// - when the child cannot be started, with `SpawnFailed`
///
/// Errors are contained in the outcome; a runner never fails the supervisor.
pub trait CommandRunner: Send + Sync + 'static {
    fn run(
        &self,
        launch: LaunchId,
        command: Arc<CommandSpec>,
        scope: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = RunOutcome> + Send>>;
}

impl<R: CommandRunner> CommandRunner for Arc<R> {
    fn run(
        &self,
        launch: LaunchId,
        command: Arc<CommandSpec>,
        scope: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = RunOutcome> + Send>> {
        (**self).run(launch, command, scope)
    }
}
