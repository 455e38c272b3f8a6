//! Runtime failures and fatal engine errors.

use super::state::RunnerState;
use crate::action::{Action, ActionKind, RegistryError};
use crate::prediction::Diff;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by `refresh`, `persist` and the queue hooks.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextError {
    #[error("{0}")]
    Failed(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// A batch-level failure recorded in the run state.
///
/// These route the machine to a failure state (or the domain's
/// `actionFailure` state); they never abort `step` itself.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", bound(deserialize = ""))]
pub enum RunFailure<K: ActionKind> {
    #[error("Executing '{action}' failed: {message}")]
    Execution { action: Action<K>, message: String },

    #[error("Refreshing context failed: {message}")]
    Refresh { message: String },

    #[error("Verifying '{action}' failed with {} diff(s)", .diffs.len())]
    Verification {
        action: Action<K>,
        diffs: Vec<Diff>,
        message: Option<String>,
    },
}

impl<K: ActionKind> RunFailure<K> {
    /// Generic final state for this failure.
    pub fn terminal_state(&self) -> RunnerState {
        match self {
            Self::Execution { .. } => RunnerState::ExecutionFailed,
            Self::Refresh { .. } | Self::Verification { .. } => RunnerState::VerificationFailed,
        }
    }

    /// The action the failure is attributed to, if any.
    pub fn action(&self) -> Option<&Action<K>> {
        match self {
            Self::Execution { action, .. } | Self::Verification { action, .. } => Some(action),
            Self::Refresh { .. } => None,
        }
    }

    pub fn diffs(&self) -> &[Diff] {
        match self {
            Self::Verification { diffs, .. } => diffs,
            Self::Execution { .. } | Self::Refresh { .. } => &[],
        }
    }
}

/// Fatal errors that stop a run outright.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("No route available from state '{state}'")]
    NoRoute { state: String },

    #[error("Unknown state '{0}'")]
    UnknownState(String),

    #[error("State '{state}' routes through unknown guard '{guard}'")]
    UnknownGuard { state: String, guard: String },

    #[error("Routing from '{state}' did not reach the runner within {hops} hops")]
    RoutingLoop { state: String, hops: usize },

    #[error("Run already finished in state '{0}'")]
    Finished(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_kind;
    use crate::prediction::Comparator;
    use serde_json::json;

    action_kind! {
        enum TestAction {
            Close,
        }
    }

    fn verification_failure() -> RunFailure<TestAction> {
        RunFailure::Verification {
            action: Action::new(TestAction::Close, json!({})),
            diffs: vec![Diff {
                field: "status".to_string(),
                comparator: Comparator::Eq,
                expected: json!("closed"),
                actual: Some(json!("open")),
            }],
            message: None,
        }
    }

    #[test]
    fn failures_map_to_generic_final_states() {
        let execution = RunFailure::Execution {
            action: Action::new(TestAction::Close, json!({})),
            message: "boom".to_string(),
        };
        let refresh: RunFailure<TestAction> = RunFailure::Refresh {
            message: "timeout".to_string(),
        };

        assert_eq!(execution.terminal_state(), RunnerState::ExecutionFailed);
        assert_eq!(refresh.terminal_state(), RunnerState::VerificationFailed);
        assert_eq!(
            verification_failure().terminal_state(),
            RunnerState::VerificationFailed
        );
        assert!(refresh.action().is_none());
    }

    #[test]
    fn failure_messages_name_the_action() {
        assert_eq!(
            verification_failure().to_string(),
            "Verifying 'Close' failed with 1 diff(s)"
        );
        assert_eq!(verification_failure().diffs().len(), 1);
    }

    #[test]
    fn failure_serializes_with_kind_tag() {
        let value = serde_json::to_value(verification_failure()).unwrap();
        assert_eq!(value["kind"], json!("verification"));

        let back: RunFailure<TestAction> = serde_json::from_value(value).unwrap();
        assert_eq!(back, verification_failure());
    }
}
