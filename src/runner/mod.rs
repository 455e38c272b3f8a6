//! Batch runner: drains the action queue through predict, execute,
//! persist, refresh and verify.
//!
//! The runner's states share one namespace with the domain's routing
//! states (see [`MachineState`]). A batch is predicted and executed against
//! one pre-batch snapshot and verified against one refreshed snapshot.

mod error;
mod hooks;
mod machine;
mod run_state;
mod state;

pub use error::{ContextError, EngineError, RunFailure};
pub use hooks::{AfterQueue, AfterQueueFn, BeforeQueueFn, Hooks, PersistFn, RefreshFn};
pub use machine::PevMachine;
pub use run_state::{CompletedAction, QueueEntry, RunState};
pub use state::{MachineState, RunnerState, ACTION_FAILURE, MAX_CYCLES_REACHED, QUEUE_EMPTY};
