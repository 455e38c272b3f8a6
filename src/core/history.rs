//! Machine-state transition history.
//!
//! Provides immutable tracking of the states a run passes through, used for
//! audit trails and run reports.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single state transition.
///
/// # Example
///
/// ```rust
/// use foresight::core::StateTransition;
/// use foresight::runner::{MachineState, RunnerState};
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: MachineState::domain("triage"),
///     to: MachineState::Runner(RunnerState::ExecutingQueue),
///     timestamp: Utc::now(),
///     cycle: 0,
/// };
/// assert_eq!(transition.to.to_string(), "executingQueue");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateTransition<S: State> {
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
    /// Completed cycles at the time of the transition
    pub cycle: u32,
}

/// Ordered history of state transitions.
///
/// `record` returns a new history with the transition appended; the
/// original is left untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: StateTransition<S>) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Get the path of states traversed.
    ///
    /// Returns the initial state followed by the `to` state of each
    /// transition.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Names of the states traversed, in order.
    pub fn state_names(&self) -> Vec<String> {
        self.get_path()
            .into_iter()
            .map(|state| state.name().to_string())
            .collect()
    }

    /// Whether the run ever entered a state with this name.
    pub fn visited(&self, name: &str) -> bool {
        self.get_path().iter().any(|state| state.name() == name)
    }

    /// Time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }
}
