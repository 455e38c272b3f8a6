//! Domain routing states.
//!
//! A domain state inspects the current snapshot, enqueues zero or more
//! actions and hands control to the next state through its first matching
//! route.

use crate::action::{Action, ActionKind};
use crate::runner::RunFailure;
use std::fmt;
use std::sync::Arc;

/// What a domain state may look at when deciding what to enqueue.
pub struct RouteContext<'a, K: ActionKind, D> {
    pub domain: &'a D,
    pub cycle_count: u32,
    /// The failure being handled, when routing through `actionFailure`.
    pub error: Option<&'a RunFailure<K>>,
}

pub type EnqueueFn<K, D> = Arc<dyn Fn(&RouteContext<'_, K, D>) -> Vec<Action<K>> + Send + Sync>;

/// A guarded edge to another state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    guard: Option<String>,
    target: String,
}

impl Route {
    pub fn guard(&self) -> Option<&str> {
        self.guard.as_deref()
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// A named state supplied by the domain.
///
/// # Example
///
/// ```rust
/// use foresight::action::Action;
/// use foresight::action_kind;
/// use foresight::builder::DomainState;
/// use serde_json::json;
///
/// action_kind! {
///     pub enum IssueAction {
///         AddLabel,
///     }
/// }
///
/// #[derive(Clone, Debug, serde::Serialize)]
/// struct Issue {
///     labels: Vec<String>,
/// }
///
/// let triage = DomainState::<IssueAction, Issue>::routing("triage")
///     .enqueue(|ctx| {
///         if ctx.domain.labels.is_empty() {
///             vec![Action::new(IssueAction::AddLabel, json!({"label": "triaged"}))]
///         } else {
///             vec![]
///         }
///     })
///     .route_if("queueEmpty", "done")
///     .route("executingQueue");
///
/// assert_eq!(triage.routes().len(), 2);
/// ```
pub struct DomainState<K: ActionKind, D> {
    name: String,
    enqueue: Option<EnqueueFn<K, D>>,
    routes: Vec<Route>,
    terminal: bool,
}

impl<K: ActionKind, D> DomainState<K, D> {
    /// A routing state; give it at least one route.
    pub fn routing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enqueue: None,
            routes: Vec::new(),
            terminal: false,
        }
    }

    /// A state that ends the run as soon as it is entered.
    pub fn terminal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enqueue: None,
            routes: Vec::new(),
            terminal: true,
        }
    }

    /// Actions to enqueue when the state is entered.
    pub fn enqueue<F>(mut self, enqueue: F) -> Self
    where
        F: Fn(&RouteContext<'_, K, D>) -> Vec<Action<K>> + Send + Sync + 'static,
    {
        self.enqueue = Some(Arc::new(enqueue));
        self
    }

    /// Unconditional route.
    pub fn route(mut self, target: impl Into<String>) -> Self {
        self.routes.push(Route {
            guard: None,
            target: target.into(),
        });
        self
    }

    /// Route taken when the named guard passes.
    pub fn route_if(mut self, guard: impl Into<String>, target: impl Into<String>) -> Self {
        self.routes.push(Route {
            guard: Some(guard.into()),
            target: target.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn enqueues(&self) -> bool {
        self.enqueue.is_some()
    }

    /// Actions this state enqueues for the given context (pure).
    pub fn enqueue_for(&self, ctx: &RouteContext<'_, K, D>) -> Vec<Action<K>> {
        self.enqueue.as_ref().map(|f| f(ctx)).unwrap_or_default()
    }
}

impl<K: ActionKind, D> fmt::Debug for DomainState<K, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainState")
            .field("name", &self.name)
            .field("routes", &self.routes)
            .field("terminal", &self.terminal)
            .field("enqueue", &self.enqueue.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_kind;
    use serde_json::json;

    action_kind! {
        enum TestAction {
            Comment,
        }
    }

    fn ctx(domain: &u32) -> RouteContext<'_, TestAction, u32> {
        RouteContext {
            domain,
            cycle_count: 0,
            error: None,
        }
    }

    #[test]
    fn routes_keep_declaration_order() {
        let state: DomainState<TestAction, u32> = DomainState::routing("review")
            .route_if("approved", "merge")
            .route("executingQueue");

        let targets: Vec<&str> = state.routes().iter().map(Route::target).collect();
        assert_eq!(targets, vec!["merge", "executingQueue"]);
        assert_eq!(state.routes()[0].guard(), Some("approved"));
        assert_eq!(state.routes()[1].guard(), None);
    }

    #[test]
    fn enqueue_reads_domain_snapshot() {
        let state = DomainState::<TestAction, u32>::routing("comment").enqueue(|ctx| {
            (0..*ctx.domain)
                .map(|i| Action::new(TestAction::Comment, json!({"n": i})))
                .collect()
        });

        assert_eq!(state.enqueue_for(&ctx(&2)).len(), 2);
        assert!(state.enqueue_for(&ctx(&0)).is_empty());
    }

    #[test]
    fn states_without_enqueue_produce_nothing() {
        let state: DomainState<TestAction, u32> = DomainState::terminal("closed");

        assert!(state.is_terminal());
        assert!(!state.enqueues());
        assert!(state.enqueue_for(&ctx(&5)).is_empty());
    }
}
