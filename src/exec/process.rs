// src/exec/process.rs

//! Real command runner on top of `tokio::process`.

use std::future::Future;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{CommandSpec, WatchConfig};
use crate::engine::{LaunchId, RunOutcome};
use crate::exec::backend::CommandRunner;
use crate::types::OutputMode;

/// How often a group left behind by an exited leader is checked.
const GROUP_POLL: Duration = Duration::from_millis(20);

/// Spawns the command directly (no shell) in its own process group.
///
/// Stopping sends `SIGTERM` to the whole group, waits up to `stop_timeout`,
/// then kills the group. Anything the command forked is cleaned up with it.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    output: OutputMode,
    stop_timeout: Duration,
}

impl ProcessRunner {
    pub fn new(output: OutputMode, stop_timeout: Duration) -> Self {
        Self {
            output,
            stop_timeout,
        }
    }

    pub fn from_config(cfg: &WatchConfig) -> Self {
        Self::new(cfg.output, cfg.stop_timeout)
    }

    async fn run_launch(
        self,
        launch: LaunchId,
        command: Arc<CommandSpec>,
        scope: CancellationToken,
    ) -> RunOutcome {
        match self.run_inner(launch, &command, &scope).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(launch, cmd = %command, error = %format!("{err:#}"), "command execution error");
                RunOutcome::SpawnFailed(format!("{err:#}"))
            }
        }
    }

    async fn run_inner(
        &self,
        launch: LaunchId,
        command: &CommandSpec,
        scope: &CancellationToken,
    ) -> Result<RunOutcome> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            // A background process group cannot read the terminal anyway.
            .stdin(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        match self.output {
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning '{command}'"))?;

        // `id()` is gone once the child is reaped; the group outlives it.
        let pid = child.id();
        info!(launch, ?pid, cmd = %command, "command started");

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, launch, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, launch, "stderr");
        }

        tokio::select! {
            status_res = child.wait() => {
                let status = status_res
                    .with_context(|| format!("waiting for '{command}'"))?;
                self.reap_group(pid, launch).await;
                Ok(outcome_from_status(status))
            }

            _ = scope.cancelled() => {
                self.stop_child(&mut child, launch).await;
                Ok(RunOutcome::Stopped)
            }
        }
    }

    async fn stop_child(&self, child: &mut Child, launch: LaunchId) {
        let pid = child.id();
        debug!(launch, ?pid, "stopping command");

        signal_group(child, GroupSignal::Terminate);

        match tokio::time::timeout(self.stop_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(launch, ?status, "command stopped");
            }
            Ok(Err(e)) => {
                warn!(launch, error = %e, "failed waiting for stopped command");
            }
            Err(_) => {
                warn!(
                    launch,
                    timeout = ?self.stop_timeout,
                    "command did not stop in time; killing it"
                );
                if let Err(e) = child.kill().await {
                    warn!(launch, error = %e, "failed to kill command");
                }
            }
        }

        // Leftover members of the group (e.g. servers forked by a script).
        signal_group_pid(pid, GroupSignal::Kill);
    }

    /// The leader exited on its own; stop anything it left running in its
    /// group, with the same grace period as a regular stop.
    async fn reap_group(&self, pid: Option<u32>, launch: LaunchId) {
        if !group_alive(pid) {
            return;
        }

        warn!(launch, ?pid, "command exited but left processes behind; stopping them");
        signal_group_pid(pid, GroupSignal::Terminate);

        let deadline = Instant::now() + self.stop_timeout;
        while group_alive(pid) && Instant::now() < deadline {
            tokio::time::sleep(GROUP_POLL).await;
        }
        signal_group_pid(pid, GroupSignal::Kill);
    }
}

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        launch: LaunchId,
        command: Arc<CommandSpec>,
        scope: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = RunOutcome> + Send>> {
        Box::pin(self.clone().run_launch(launch, command, scope))
    }
}

fn outcome_from_status(status: ExitStatus) -> RunOutcome {
    if status.success() {
        RunOutcome::Success
    } else {
        RunOutcome::Failed(status.code().unwrap_or(-1))
    }
}

/// Consume a child stream on its own task so a full pipe never stalls the
/// child, and the supervisor never waits on output.
fn forward_lines<R>(stream: R, launch: LaunchId, name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(launch, stream = name, "{}", line);
        }
        debug!(launch, stream = name, "output stream closed");
    });
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Terminate,
    Kill,
}

fn signal_group(child: &mut Child, sig: GroupSignal) {
    #[cfg(unix)]
    signal_group_pid(child.id(), sig);

    #[cfg(not(unix))]
    if let Err(e) = child.start_kill() {
        debug!(error = %e, ?sig, "failed to signal command");
    }
}

#[cfg(unix)]
fn signal_group_pid(pid: Option<u32>, sig: GroupSignal) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    let signal = match sig {
        GroupSignal::Terminate => Signal::SIGTERM,
        GroupSignal::Kill => Signal::SIGKILL,
    };
    // The group id equals the leader's pid because of `process_group(0)`.
    // ESRCH just means the whole group is already gone.
    if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
        if e != nix::errno::Errno::ESRCH {
            debug!(pid, ?signal, error = %e, "failed to signal process group");
        }
    }
}

#[cfg(not(unix))]
fn signal_group_pid(_pid: Option<u32>, _sig: GroupSignal) {}

/// Whether any process is still in the group led by `pid`.
#[cfg(unix)]
fn group_alive(pid: Option<u32>) -> bool {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    match pid {
        Some(pid) => killpg(Pid::from_raw(pid as i32), None).is_ok(),
        None => false,
    }
}

#[cfg(not(unix))]
fn group_alive(_pid: Option<u32>) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Instant;

    use super::*;

    fn spec(raw: &str) -> Arc<CommandSpec> {
        Arc::new(CommandSpec::parse(raw).unwrap())
    }

    #[tokio::test]
    async fn reports_exit_status() {
        let runner = ProcessRunner::new(OutputMode::Capture, Duration::from_secs(1));

        let ok = runner.run(1, spec("true"), CancellationToken::new()).await;
        assert_eq!(ok, RunOutcome::Success);

        let failed = runner.run(2, spec("false"), CancellationToken::new()).await;
        assert_eq!(failed, RunOutcome::Failed(1));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_failure() {
        let runner = ProcessRunner::new(OutputMode::Inherit, Duration::from_secs(1));
        let outcome = runner
            .run(1, spec("definitely-not-a-real-program-xyz"), CancellationToken::new())
            .await;
        assert!(matches!(outcome, RunOutcome::SpawnFailed(_)));
    }

    #[tokio::test]
    async fn cancelling_scope_stops_long_running_command() {
        let runner = ProcessRunner::new(OutputMode::Capture, Duration::from_secs(2));
        let scope = CancellationToken::new();

        let started = Instant::now();
        let task = tokio::spawn(runner.run(1, spec("sleep 30"), scope.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        scope.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("runner did not return")
            .unwrap();
        assert_eq!(outcome, RunOutcome::Stopped);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Running, as opposed to gone or a zombie waiting for its new parent.
    fn is_running(pid: i32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        if std::path::Path::new("/proc/self").exists() {
            return match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
                Ok(stat) => stat
                    .rsplit(')')
                    .next()
                    .and_then(|rest| rest.trim_start().chars().next())
                    .is_some_and(|state| state != 'Z'),
                Err(_) => false,
            };
        }
        kill(Pid::from_raw(pid), None).is_ok()
    }

    #[tokio::test]
    async fn natural_exit_stops_background_members_of_the_group() {
        let runner = ProcessRunner::new(OutputMode::Inherit, Duration::from_millis(200));
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("bg.pid");

        let cmd = Arc::new(CommandSpec {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                format!("sleep 30 & echo $! > '{}'", pid_file.display()),
            ],
        });
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            runner.run(1, cmd, CancellationToken::new()),
        )
        .await
        .expect("runner did not return");
        assert_eq!(outcome, RunOutcome::Success);

        let pid: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();

        let mut gone = false;
        for _ in 0..50 {
            if !is_running(pid) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(gone, "background process {pid} outlived the launch");
    }

    #[tokio::test]
    async fn command_ignoring_sigterm_is_killed_after_timeout() {
        let runner = ProcessRunner::new(OutputMode::Capture, Duration::from_millis(200));
        let scope = CancellationToken::new();

        // Ignored signals survive exec, so neither sh nor sleep reacts to TERM.
        let cmd = Arc::new(CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "trap '' TERM; sleep 30".to_string()],
        });
        let task = tokio::spawn(runner.run(1, cmd, scope.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        scope.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("runner did not return")
            .unwrap();
        assert_eq!(outcome, RunOutcome::Stopped);
    }
}
