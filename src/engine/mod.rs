// src/engine/mod.rs

//! Process supervision for pollwatch.
//!
//! The supervisor reacts to:
//! - change notifications from the detector
//! - exits of the child it launched
//! - shutdown (global cancellation, or the detector going away)
//!
//! The pure state machine lives in [`core`]; the async shell that owns the
//! child task is implemented in [`runtime`].

/// Monotonic id of one launch of the command.
pub type LaunchId = u64;

/// How one launch of the command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// Non-zero exit; `-1` when the process died from a signal.
    Failed(i32),
    /// The command could not be started (or waited on) at all.
    SpawnFailed(String),
    /// Ended because the supervisor stopped it.
    Stopped,
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed(_) | RunOutcome::SpawnFailed(_))
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunOutcome::Success => Some(0),
            RunOutcome::Failed(code) => Some(*code),
            RunOutcome::SpawnFailed(_) | RunOutcome::Stopped => None,
        }
    }
}

/// Events flowing into the supervisor core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Something under the watched root changed.
    ChangeDetected,
    /// The child of launch `launch` ended on its own.
    ChildExited { launch: LaunchId, outcome: RunOutcome },
    /// Stop everything.
    ShutdownRequested,
}

pub mod core;
pub mod runtime;

pub use core::{CoreCommand, CoreStep, SupervisorCore, SupervisorState, SupervisorStats};
pub use runtime::Supervisor;
