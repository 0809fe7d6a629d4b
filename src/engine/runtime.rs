// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::CommandSpec;
use crate::exec::CommandRunner;

use super::core::SupervisorCore;
use super::{CoreCommand, LaunchId, RunOutcome, SupervisorEvent, SupervisorStats};

/// Extra time, on top of the runner's own stop timeout, before a stuck
/// launch task is aborted.
const STOP_MARGIN: Duration = Duration::from_secs(1);

/// The one live launch.
struct ActiveChild {
    launch: LaunchId,
    /// Per-launch scope, independent of the global token. Cancelling it
    /// stops only this launch.
    scope: CancellationToken,
    handle: JoinHandle<RunOutcome>,
}

/// Restarts the command on every notification.
///
/// IO shell around [`SupervisorCore`]: it waits for notifications, child
/// exits and cancellation, feeds them to the core and executes the returned
/// commands. It never holds more than one child.
pub struct Supervisor<R: CommandRunner> {
    core: SupervisorCore,
    runner: R,
    command: Arc<CommandSpec>,
    stop_timeout: Duration,
    active: Option<ActiveChild>,
}

impl<R: CommandRunner> fmt::Debug for Supervisor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("core", &self.core)
            .field("command", &self.command)
            .field("active", &self.active.as_ref().map(|a| a.launch))
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> Supervisor<R> {
    /// `stop_timeout` should match the runner's own grace period; the
    /// supervisor waits that long plus a small margin for a stopped launch.
    pub fn new(runner: R, command: CommandSpec, stop_timeout: Duration) -> Self {
        Self {
            core: SupervisorCore::new(),
            runner,
            command: Arc::new(command),
            stop_timeout,
            active: None,
        }
    }

    /// Main loop. Returns once `cancel` fires or the notification channel
    /// closes, after the current child (if any) is gone.
    pub async fn run(
        mut self,
        cancel: CancellationToken,
        mut notify_rx: mpsc::Receiver<()>,
    ) -> SupervisorStats {
        info!(cmd = %self.command, "supervisor started");

        loop {
            let event = self.next_event(&cancel, &mut notify_rx).await;
            debug!(?event, "supervisor received event");

            if let SupervisorEvent::ChildExited { launch, outcome } = &event {
                report_exit(*launch, outcome);
            }

            let step = self.core.step(event);
            for command in step.commands {
                self.execute(command).await;
            }

            if !step.keep_running {
                break;
            }
        }

        let stats = self.core.stats();
        info!(
            launches = stats.launches,
            restarts = stats.restarts,
            failures = stats.failures,
            "supervisor stopped"
        );
        stats
    }

    /// Wait for whichever comes first. Ties resolve in declaration order:
    /// cancellation, then a new change, then the child's own exit.
    async fn next_event(
        &mut self,
        cancel: &CancellationToken,
        notify_rx: &mut mpsc::Receiver<()>,
    ) -> SupervisorEvent {
        let Some(active) = self.active.as_mut() else {
            return tokio::select! {
                biased;
                _ = cancel.cancelled() => SupervisorEvent::ShutdownRequested,
                msg = notify_rx.recv() => notification_event(msg),
            };
        };

        let launch = active.launch;
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SupervisorEvent::ShutdownRequested,
            msg = notify_rx.recv() => return notification_event(msg),
            joined = &mut active.handle => joined,
        };

        self.active = None;
        SupervisorEvent::ChildExited {
            launch,
            outcome: outcome_from_join(joined),
        }
    }

    async fn execute(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::Launch { launch } => self.launch(launch),
            CoreCommand::StopChild { launch } => self.stop(launch).await,
        }
    }

    fn launch(&mut self, launch: LaunchId) {
        // Core only issues a launch after stopping the previous one.
        debug_assert!(self.active.is_none(), "launch while a child is active");

        let scope = CancellationToken::new();
        info!(launch, cmd = %self.command, "launching command");
        let fut = self
            .runner
            .run(launch, Arc::clone(&self.command), scope.clone());
        self.active = Some(ActiveChild {
            launch,
            scope,
            handle: tokio::spawn(fut),
        });
    }

    async fn stop(&mut self, launch: LaunchId) {
        let Some(mut active) = self.active.take() else {
            debug!(launch, "stop requested but no child is active");
            return;
        };
        if active.launch != launch {
            warn!(launch, active = active.launch, "stop requested for a different launch");
        }

        info!(launch = active.launch, "stopping command");
        active.scope.cancel();

        let limit = self.stop_timeout + STOP_MARGIN;
        match tokio::time::timeout(limit, &mut active.handle).await {
            Ok(joined) => {
                debug!(launch = active.launch, outcome = ?outcome_from_join(joined), "command stopped");
            }
            Err(_) => {
                // Dropping the runner future drops the child, and
                // `kill_on_drop` takes care of the process.
                error!(launch = active.launch, ?limit, "launch did not stop in time; aborting it");
                active.handle.abort();
                let _ = active.handle.await;
            }
        }
    }
}

fn notification_event(msg: Option<()>) -> SupervisorEvent {
    match msg {
        Some(()) => SupervisorEvent::ChangeDetected,
        None => {
            debug!("notification channel closed; shutting down");
            SupervisorEvent::ShutdownRequested
        }
    }
}

fn outcome_from_join(joined: Result<RunOutcome, JoinError>) -> RunOutcome {
    joined.unwrap_or_else(|e| RunOutcome::SpawnFailed(format!("launch task failed: {e}")))
}

fn report_exit(launch: LaunchId, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Success => info!(launch, exit_code = 0, "command finished; waiting for changes"),
        RunOutcome::Failed(code) => {
            warn!(launch, exit_code = *code, "command failed; waiting for changes")
        }
        RunOutcome::SpawnFailed(reason) => {
            error!(launch, %reason, "command could not run; waiting for changes")
        }
        RunOutcome::Stopped => debug!(launch, "command stopped"),
    }
}
