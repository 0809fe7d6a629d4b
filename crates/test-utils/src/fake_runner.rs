use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use pollwatch::config::CommandSpec;
use pollwatch::engine::{LaunchId, RunOutcome};
use pollwatch::exec::CommandRunner;

/// What each fake launch does.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Run until the supervisor stops it.
    UntilStopped,
    /// Exit on its own after the delay unless stopped first.
    ExitAfter(Duration, RunOutcome),
    /// Never returns, not even when stopped.
    IgnoreStop,
}

#[derive(Debug, Default)]
struct FakeState {
    launches: Mutex<Vec<LaunchId>>,
    stopped: Mutex<Vec<LaunchId>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

/// Decrements the running count however the launch future ends.
struct RunningGuard(Arc<FakeState>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A fake runner that:
/// - records every launch and every stop
/// - tracks how many launches are alive at once
/// - never spawns a process
///
/// Clones share state, so a test keeps one and hands another to the
/// supervisor.
#[derive(Debug, Clone)]
pub struct FakeRunner {
    state: Arc<FakeState>,
    behaviour: FakeBehaviour,
}

impl FakeRunner {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        Self {
            state: Arc::new(FakeState::default()),
            behaviour,
        }
    }

    pub fn until_stopped() -> Self {
        Self::new(FakeBehaviour::UntilStopped)
    }

    pub fn exiting_after(delay: Duration, outcome: RunOutcome) -> Self {
        Self::new(FakeBehaviour::ExitAfter(delay, outcome))
    }

    pub fn launches(&self) -> Vec<LaunchId> {
        self.state.launches.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> Vec<LaunchId> {
        self.state.stopped.lock().unwrap().clone()
    }

    pub fn running(&self) -> usize {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Highest number of launches that were alive at the same time.
    pub fn max_running(&self) -> usize {
        self.state.max_running.load(Ordering::SeqCst)
    }

    /// Poll until at least `n` launches have started.
    pub async fn wait_for_launches(&self, n: usize) {
        while self.state.launches.lock().unwrap().len() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        launch: LaunchId,
        _command: Arc<CommandSpec>,
        scope: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = RunOutcome> + Send>> {
        let state = Arc::clone(&self.state);
        let behaviour = self.behaviour.clone();

        Box::pin(async move {
            state.launches.lock().unwrap().push(launch);
            let now = state.running.fetch_add(1, Ordering::SeqCst) + 1;
            state.max_running.fetch_max(now, Ordering::SeqCst);
            let _guard = RunningGuard(Arc::clone(&state));

            let outcome = match behaviour {
                FakeBehaviour::UntilStopped => {
                    scope.cancelled().await;
                    RunOutcome::Stopped
                }
                FakeBehaviour::ExitAfter(delay, outcome) => tokio::select! {
                    _ = scope.cancelled() => RunOutcome::Stopped,
                    _ = tokio::time::sleep(delay) => outcome,
                },
                FakeBehaviour::IgnoreStop => std::future::pending().await,
            };

            if outcome == RunOutcome::Stopped {
                state.stopped.lock().unwrap().push(launch);
            }
            outcome
        })
    }
}
