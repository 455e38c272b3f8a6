//! Serializable record of a finished run.
//!
//! A report captures everything an audit trail needs once the machine has
//! been dropped: the final state, every completed action with its
//! verification flag, the failure (if any), the full machine-state history
//! and the final domain snapshot.

use crate::action::ActionKind;
use crate::core::{State, StateHistory};
use crate::runner::{CompletedAction, MachineState, RunFailure, RunState};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub mod error;

pub use error::ReportError;

/// Version identifier for report format
pub const REPORT_VERSION: u32 = 1;

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunOutcome {
    Completed,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "D: Deserialize<'de>"))]
pub struct RunReport<K: ActionKind, D> {
    /// Report format version
    pub version: u32,

    /// Run identifier
    pub id: Uuid,

    pub label: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Name of the state the run ended in
    pub final_state: String,

    pub outcome: RunOutcome,
    pub cycle_count: u32,
    pub max_cycles: u32,
    pub completed_actions: Vec<CompletedAction<K>>,
    pub error: Option<RunFailure<K>>,
    pub history: StateHistory<MachineState>,

    /// Domain snapshot at the end of the run
    pub domain: D,
}

impl<K: ActionKind, D> RunReport<K, D> {
    pub(crate) fn new(
        id: Uuid,
        label: String,
        started_at: DateTime<Utc>,
        final_state: MachineState,
        run: RunState<K, D>,
        history: StateHistory<MachineState>,
    ) -> Self {
        let outcome = if run.error.is_some() || final_state.is_error() {
            RunOutcome::Failed
        } else {
            RunOutcome::Completed
        };

        Self {
            version: REPORT_VERSION,
            id,
            label,
            started_at,
            finished_at: Utc::now(),
            final_state: final_state.name().to_string(),
            outcome,
            cycle_count: run.cycle_count,
            max_cycles: run.max_cycles,
            completed_actions: run.completed_actions,
            error: run.error,
            history,
            domain: run.domain,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    pub fn verified_count(&self) -> usize {
        self.completed_actions.iter().filter(|a| a.verified).count()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} run {} ended in '{}' after {} cycle(s): {}/{} action(s) verified",
            self.label,
            self.id,
            self.final_state,
            self.cycle_count,
            self.verified_count(),
            self.completed_actions.len()
        );
        if let Some(error) = &self.error {
            summary.push_str(&format!(" ({error})"));
        }
        summary
    }
}

impl<K: ActionKind, D: Serialize> RunReport<K, D> {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::SerializationFailed(e.to_string()))
    }
}

impl<K: ActionKind, D: DeserializeOwned> RunReport<K, D> {
    /// Deserialize from JSON, rejecting reports written by a newer format.
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ReportError::DeserializationFailed(e.to_string()))?;

        let found = value
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| ReportError::DeserializationFailed("missing version".to_string()))?;
        if found != u64::from(REPORT_VERSION) {
            return Err(ReportError::UnsupportedVersion {
                found: u32::try_from(found).unwrap_or(u32::MAX),
                supported: REPORT_VERSION,
            });
        }

        serde_json::from_value(value).map_err(|e| ReportError::DeserializationFailed(e.to_string()))
    }
}
