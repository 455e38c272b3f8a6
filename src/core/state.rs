//! Traits for machine states and domain snapshots.
//!
//! Machine states describe *where* a run is (a domain routing state or one
//! of the fixed runner states). Domain contexts describe *what* the engine
//! currently believes about the external system.

use serde::Serialize;
use std::fmt::Debug;

/// Trait for machine states.
///
/// All methods are pure - no side effects. States are values that describe
/// the current position of a run and are recorded in its history.
///
/// # Example
///
/// ```rust
/// use foresight::core::State;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Phase {
///     Routing,
///     Draining,
///     Done,
///     Failed,
/// }
///
/// impl State for Phase {
///     fn name(&self) -> &str {
///         match self {
///             Self::Routing => "routing",
///             Self::Draining => "draining",
///             Self::Done => "done",
///             Self::Failed => "failed",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Done | Self::Failed)
///     }
///
///     fn is_error(&self) -> bool {
///         matches!(self, Self::Failed)
///     }
/// }
///
/// assert!(Phase::Failed.is_final());
/// assert!(!Phase::Routing.is_error());
/// ```
pub trait State: Clone + PartialEq + Debug + Send + Sync {
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Check if this is a final (terminal) state.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// Check if this is an error state.
    ///
    /// Error states are typically also final states, but this is not enforced.
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }
}

/// Snapshot of the external system owned by a run.
///
/// A domain context is plain data: cloning it must not perform side effects,
/// and its serialized form is what prediction checks read field paths from.
/// Any type meeting the bounds implements it automatically.
pub trait DomainContext: Clone + Debug + Serialize + Send + Sync + 'static {}

impl<T> DomainContext for T where T: Clone + Debug + Serialize + Send + Sync + 'static {}

/// Caller-supplied services every effect runs against.
///
/// The engine passes the environment unchanged to `execute`, `refresh`,
/// `persist` and the queue hooks and never inspects it.
pub trait Environment: Clone + Send + Sync + 'static {}

impl<T> Environment for T where T: Clone + Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    enum TestState {
        Routing,
        Executing,
        Done,
        Failed,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Routing => "Routing",
                Self::Executing => "Executing",
                Self::Done => "Done",
                Self::Failed => "Failed",
            }
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::Done | Self::Failed)
        }

        fn is_error(&self) -> bool {
            matches!(self, Self::Failed)
        }
    }

    #[derive(Clone, Debug, Serialize)]
    struct Ticket {
        status: String,
    }

    fn assert_domain<D: DomainContext>(_: &D) {}

    #[test]
    fn state_name_returns_correct_value() {
        assert_eq!(TestState::Routing.name(), "Routing");
        assert_eq!(TestState::Executing.name(), "Executing");
        assert_eq!(TestState::Done.name(), "Done");
        assert_eq!(TestState::Failed.name(), "Failed");
    }

    #[test]
    fn is_final_identifies_terminal_states() {
        assert!(!TestState::Routing.is_final());
        assert!(!TestState::Executing.is_final());
        assert!(TestState::Done.is_final());
        assert!(TestState::Failed.is_final());
    }

    #[test]
    fn is_error_identifies_error_states() {
        assert!(!TestState::Routing.is_error());
        assert!(!TestState::Done.is_error());
        assert!(TestState::Failed.is_error());
    }

    #[test]
    fn plain_data_is_a_domain_context() {
        let ticket = Ticket {
            status: "open".to_string(),
        };
        assert_domain(&ticket);
        assert_domain(&serde_json::json!({ "status": "open" }));
    }
}
