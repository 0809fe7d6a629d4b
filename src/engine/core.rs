// src/engine/core.rs

//! Pure supervisor state machine.
//!
//! Consumes [`SupervisorEvent`]s and produces the commands the async shell
//! (`engine::runtime::Supervisor`) must carry out. No Tokio, no processes,
//! so every transition can be unit tested directly.

use crate::engine::{LaunchId, RunOutcome, SupervisorEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No child running; waiting for a change.
    Idle,
    /// Exactly one child, started by launch `launch`.
    Running { launch: LaunchId },
    /// Loop has ended; nothing else will be launched.
    Terminal,
}

/// Command produced by the core, to be executed by the shell in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreCommand {
    /// Cancel the launch's scope and wait (bounded) for its child to go away.
    StopChild { launch: LaunchId },
    /// Start the command under a fresh scope.
    Launch { launch: LaunchId },
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the shell loop should keep running.
    pub keep_running: bool,
}

/// Counters over the supervisor's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub launches: u64,
    /// Launches that replaced a still-running child.
    pub restarts: u64,
    /// Children that exited non-zero or failed to start.
    pub failures: u64,
}

#[derive(Debug)]
pub struct SupervisorCore {
    state: SupervisorState,
    next_launch: LaunchId,
    stats: SupervisorStats,
}

impl Default for SupervisorCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisorCore {
    pub fn new() -> Self {
        Self {
            state: SupervisorState::Idle,
            next_launch: 1,
            stats: SupervisorStats::default(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats
    }

    pub fn step(&mut self, event: SupervisorEvent) -> CoreStep {
        match (self.state, event) {
            (SupervisorState::Terminal, _) => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },

            (state, SupervisorEvent::ShutdownRequested) => {
                self.state = SupervisorState::Terminal;
                let commands = match state {
                    SupervisorState::Running { launch } => vec![CoreCommand::StopChild { launch }],
                    _ => Vec::new(),
                };
                CoreStep {
                    commands,
                    keep_running: false,
                }
            }

            (SupervisorState::Idle, SupervisorEvent::ChangeDetected) => {
                let launch = self.begin_launch();
                running(vec![CoreCommand::Launch { launch }])
            }

            // A newer change always wins over letting the current child finish.
            (SupervisorState::Running { launch: current }, SupervisorEvent::ChangeDetected) => {
                self.stats.restarts += 1;
                let launch = self.begin_launch();
                running(vec![
                    CoreCommand::StopChild { launch: current },
                    CoreCommand::Launch { launch },
                ])
            }

            (
                SupervisorState::Running { launch: current },
                SupervisorEvent::ChildExited { launch, outcome },
            ) if launch == current => {
                if outcome.is_failure() {
                    self.stats.failures += 1;
                }
                self.state = SupervisorState::Idle;
                running(Vec::new())
            }

            // Exit report from a launch that is no longer current.
            (_, SupervisorEvent::ChildExited { .. }) => running(Vec::new()),
        }
    }

    fn begin_launch(&mut self) -> LaunchId {
        let launch = self.next_launch;
        self.next_launch += 1;
        self.stats.launches += 1;
        self.state = SupervisorState::Running { launch };
        launch
    }
}

fn running(commands: Vec<CoreCommand>) -> CoreStep {
    CoreStep {
        commands,
        keep_running: true,
    }
}
