//! Builder API for composing a domain machine with the batch runner.
//!
//! This module provides fluent builders and the `action_kind!` macro for
//! declaring domains with minimal boilerplate while keeping action dispatch
//! exhaustive.

pub mod domain;
pub mod error;
pub mod machine;
pub mod macros;

pub use domain::{DomainState, EnqueueFn, Route, RouteContext};
pub use error::BuildError;
pub use machine::{compose, DomainConfig, MachineBuilder, MachineDefinition};

use crate::action::{Action, ActionKind};
use crate::runner::{RunnerState, QUEUE_EMPTY};

/// Create a routing state that enqueues actions and drains them.
///
/// The state routes to `done` when it enqueued nothing and to
/// `executingQueue` otherwise.
///
/// # Example
///
/// ```
/// use foresight::action::Action;
/// use foresight::action_kind;
/// use foresight::builder::drain_state;
/// use serde_json::json;
///
/// action_kind! {
///     enum IssueAction {
///         Close,
///     }
/// }
///
/// let state = drain_state::<IssueAction, bool, _>("close", |ctx| {
///     if *ctx.domain {
///         vec![Action::new(IssueAction::Close, json!({}))]
///     } else {
///         vec![]
///     }
/// });
///
/// assert_eq!(state.routes()[0].guard(), Some("queueEmpty"));
/// assert_eq!(state.routes()[1].target(), "executingQueue");
/// ```
pub fn drain_state<K, D, F>(name: impl Into<String>, enqueue: F) -> DomainState<K, D>
where
    K: ActionKind,
    F: Fn(&RouteContext<'_, K, D>) -> Vec<Action<K>> + Send + Sync + 'static,
{
    DomainState::routing(name)
        .enqueue(enqueue)
        .route_if(QUEUE_EMPTY, RunnerState::Done.name())
        .route(RunnerState::ExecutingQueue.name())
}
