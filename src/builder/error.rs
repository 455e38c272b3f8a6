//! Configuration errors raised while composing a machine.

use thiserror::Error;

/// Errors that can occur when composing a domain machine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(name) before .build()")]
    MissingInitialState,

    #[error("Initial state '{0}' is not a domain state")]
    UnknownInitialState(String),

    #[error("Refresh effect not specified. Call .refresh(effect) before .build()")]
    MissingRefresh,

    #[error("State '{0}' is defined more than once")]
    DuplicateState(String),

    #[error("Guard '{0}' is defined more than once")]
    DuplicateGuard(String),

    #[error("State '{state}' routes on unknown guard '{guard}'")]
    UnknownGuard { state: String, guard: String },

    #[error("State '{state}' routes to unknown state '{target}'")]
    UnknownTarget { state: String, target: String },

    #[error("State '{state}' routes to internal runner state '{target}'")]
    InvalidTarget { state: String, target: String },

    #[error("Routing state '{0}' has no routes")]
    MissingRoutes(String),

    #[error("Terminal state '{0}' cannot enqueue actions or route")]
    TerminalWithRoutes(String),

    #[error("Action type '{0}' has no registered definition")]
    UnregisteredAction(String),

    #[error("max_cycles must be at least 1")]
    InvalidMaxCycles,
}
