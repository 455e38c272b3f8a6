//! Runner states and the merged machine-state namespace.

use crate::core::State;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the optional domain state that receives runner failures.
pub const ACTION_FAILURE: &str = "actionFailure";

/// Runner-provided guard: the pending action queue is empty.
pub const QUEUE_EMPTY: &str = "queueEmpty";

/// Runner-provided guard: the cycle ceiling has been reached.
pub const MAX_CYCLES_REACHED: &str = "maxCyclesReached";

/// Fixed states of the batch runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunnerState {
    ExecutingQueue,
    ExecutingBatch,
    PersistingBatch,
    RefreshingContext,
    VerifyingBatch,
    QueueComplete,
    ExecutionFailed,
    VerificationFailed,
    Done,
}

impl RunnerState {
    pub const ALL: [RunnerState; 9] = [
        RunnerState::ExecutingQueue,
        RunnerState::ExecutingBatch,
        RunnerState::PersistingBatch,
        RunnerState::RefreshingContext,
        RunnerState::VerifyingBatch,
        RunnerState::QueueComplete,
        RunnerState::ExecutionFailed,
        RunnerState::VerificationFailed,
        RunnerState::Done,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExecutingQueue => "executingQueue",
            Self::ExecutingBatch => "executingBatch",
            Self::PersistingBatch => "persistingBatch",
            Self::RefreshingContext => "refreshingContext",
            Self::VerifyingBatch => "verifyingBatch",
            Self::QueueComplete => "queueComplete",
            Self::ExecutionFailed => "executionFailed",
            Self::VerificationFailed => "verificationFailed",
            Self::Done => "done",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|state| state.name() == name)
    }

    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::ExecutionFailed | Self::VerificationFailed | Self::Done
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::ExecutionFailed | Self::VerificationFailed)
    }

    /// Whether domain routes may target this state.
    pub fn is_routable(&self) -> bool {
        matches!(self, Self::ExecutingQueue | Self::Done)
    }
}

/// Position of a run: a domain routing state or a runner state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MachineState {
    Domain {
        name: String,
        #[serde(default)]
        terminal: bool,
    },
    Runner(RunnerState),
}

impl MachineState {
    /// A non-terminal domain state.
    pub fn domain(name: impl Into<String>) -> Self {
        Self::Domain {
            name: name.into(),
            terminal: false,
        }
    }

    /// A domain state that ends the run when entered.
    pub fn terminal(name: impl Into<String>) -> Self {
        Self::Domain {
            name: name.into(),
            terminal: true,
        }
    }

    pub fn runner(&self) -> Option<RunnerState> {
        match self {
            Self::Runner(state) => Some(*state),
            Self::Domain { .. } => None,
        }
    }
}

impl State for MachineState {
    fn name(&self) -> &str {
        match self {
            Self::Domain { name, .. } => name,
            Self::Runner(state) => state.name(),
        }
    }

    fn is_final(&self) -> bool {
        match self {
            Self::Domain { terminal, .. } => *terminal,
            Self::Runner(state) => state.is_final(),
        }
    }

    fn is_error(&self) -> bool {
        match self {
            Self::Domain { name, terminal } => *terminal && name == ACTION_FAILURE,
            Self::Runner(state) => state.is_error(),
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
