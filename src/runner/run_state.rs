//! Mutable state of a single run.

use super::error::RunFailure;
use crate::action::{Action, ActionKind};
use crate::prediction::Prediction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One action of the batch in flight.
///
/// Every entry of a batch shares the same pre-batch snapshot: the batch is
/// predicted and executed against one view of the domain.
#[derive(Clone, Debug)]
pub struct QueueEntry<K: ActionKind, D> {
    pub action: Action<K>,
    pub prediction: Option<Prediction>,
    pub pre_snapshot: Arc<D>,
    pub execute_result: Option<Value>,
}

/// Audit record of an executed action. Never modified after it is appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = ""))]
pub struct CompletedAction<K: ActionKind> {
    pub action: Action<K>,
    pub result: Option<Value>,
    pub verified: bool,
    pub completed_at: DateTime<Utc>,
}

impl<K: ActionKind> CompletedAction<K> {
    pub(crate) fn from_entry<D>(entry: &QueueEntry<K, D>, verified: bool) -> Self {
        Self {
            action: entry.action.clone(),
            result: entry.execute_result.clone(),
            verified,
            completed_at: Utc::now(),
        }
    }
}

/// Everything the runner tracks between steps.
#[derive(Clone, Debug)]
pub struct RunState<K: ActionKind, D> {
    pub domain: D,
    pub action_queue: Vec<Action<K>>,
    pub queue_predictions: Vec<QueueEntry<K, D>>,
    pub completed_actions: Vec<CompletedAction<K>>,
    pub cycle_count: u32,
    pub max_cycles: u32,
    pub error: Option<RunFailure<K>>,
}

impl<K: ActionKind, D> RunState<K, D> {
    pub fn new(domain: D, max_cycles: u32) -> Self {
        Self {
            domain,
            action_queue: Vec::new(),
            queue_predictions: Vec::new(),
            completed_actions: Vec::new(),
            cycle_count: 0,
            max_cycles,
            error: None,
        }
    }

    pub fn max_cycles_reached(&self) -> bool {
        self.cycle_count >= self.max_cycles
    }

    pub fn verified_count(&self) -> usize {
        self.completed_actions.iter().filter(|a| a.verified).count()
    }

    /// Append the first `count` in-flight entries as unverified.
    pub(crate) fn record_unverified(&mut self, count: usize) {
        let records: Vec<CompletedAction<K>> = self
            .queue_predictions
            .iter()
            .take(count)
            .map(|entry| CompletedAction::from_entry(entry, false))
            .collect();
        self.completed_actions.extend(records);
    }
}
