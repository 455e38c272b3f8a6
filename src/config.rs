//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default cycle ceiling: one routing decision and one drained queue.
pub const DEFAULT_MAX_CYCLES: u32 = 1;

/// Default label passed to the queue hooks.
pub const DEFAULT_LABEL: &str = "pev";

/// Tunables for a composed machine.
///
/// # Example
///
/// ```rust
/// use foresight::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{"max_cycles": 3}"#).unwrap();
/// assert_eq!(config.max_cycles, 3);
/// assert_eq!(config.label, "pev");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of drained queues after which the run stops in `done`.
    pub max_cycles: u32,

    /// Label handed to `before_queue` / `after_queue`, e.g. the workflow name.
    pub label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Parse a configuration document; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
