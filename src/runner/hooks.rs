//! Effects injected by the caller around each batch.

use super::error::{ContextError, RunFailure};
use super::run_state::CompletedAction;
use crate::action::ActionKind;
use crate::core::{DomainContext, Environment};
use std::fmt;
use std::sync::Arc;
use stillwater::effect::BoxedEffect;

/// Re-derives the domain snapshot from the source of truth.
pub type RefreshFn<D, Env> = Arc<dyn Fn(&D) -> BoxedEffect<D, ContextError, Env> + Send + Sync>;

/// Writes the in-memory domain to durable storage before refresh.
pub type PersistFn<D, Env> = Arc<dyn Fn(&D) -> BoxedEffect<(), ContextError, Env> + Send + Sync>;

/// Runs before a non-empty batch, with the configured label.
pub type BeforeQueueFn<D, Env> =
    Arc<dyn Fn(&D, &str) -> BoxedEffect<(), ContextError, Env> + Send + Sync>;

/// Runs after a batch completes or fails.
pub type AfterQueueFn<K, D, Env> =
    Arc<dyn Fn(&AfterQueue<'_, K, D>) -> BoxedEffect<(), ContextError, Env> + Send + Sync>;

/// What `after_queue` sees about the batch that just ended.
pub struct AfterQueue<'a, K: ActionKind, D> {
    pub domain: &'a D,
    pub label: &'a str,
    /// Completed actions of this batch only.
    pub completed: &'a [CompletedAction<K>],
    pub error: Option<&'a RunFailure<K>>,
}

/// The engine's I/O boundary.
///
/// `refresh` is required; the other hooks are optional and an absent hook
/// is a no-op that always succeeds.
pub struct Hooks<K: ActionKind, D: DomainContext, Env: Environment> {
    pub refresh: RefreshFn<D, Env>,
    pub persist: Option<PersistFn<D, Env>>,
    pub before_queue: Option<BeforeQueueFn<D, Env>>,
    pub after_queue: Option<AfterQueueFn<K, D, Env>>,
}

impl<K: ActionKind, D: DomainContext, Env: Environment> Hooks<K, D, Env> {
    pub fn new<F>(refresh: F) -> Self
    where
        F: Fn(&D) -> BoxedEffect<D, ContextError, Env> + Send + Sync + 'static,
    {
        Self {
            refresh: Arc::new(refresh),
            persist: None,
            before_queue: None,
            after_queue: None,
        }
    }

    pub fn persist<F>(mut self, persist: F) -> Self
    where
        F: Fn(&D) -> BoxedEffect<(), ContextError, Env> + Send + Sync + 'static,
    {
        self.persist = Some(Arc::new(persist));
        self
    }

    pub fn before_queue<F>(mut self, hook: F) -> Self
    where
        F: Fn(&D, &str) -> BoxedEffect<(), ContextError, Env> + Send + Sync + 'static,
    {
        self.before_queue = Some(Arc::new(hook));
        self
    }

    pub fn after_queue<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AfterQueue<'_, K, D>) -> BoxedEffect<(), ContextError, Env> + Send + Sync + 'static,
    {
        self.after_queue = Some(Arc::new(hook));
        self
    }
}

impl<K: ActionKind, D: DomainContext, Env: Environment> Clone for Hooks<K, D, Env> {
    fn clone(&self) -> Self {
        Self {
            refresh: Arc::clone(&self.refresh),
            persist: self.persist.clone(),
            before_queue: self.before_queue.clone(),
            after_queue: self.after_queue.clone(),
        }
    }
}

impl<K: ActionKind, D: DomainContext, Env: Environment> fmt::Debug for Hooks<K, D, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("persist", &self.persist.is_some())
            .field("before_queue", &self.before_queue.is_some())
            .field("after_queue", &self.after_queue.is_some())
            .finish_non_exhaustive()
    }
}
