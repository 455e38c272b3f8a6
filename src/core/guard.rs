//! Guard predicates for selecting domain routes.
//!
//! Guards are pure boolean functions of the current domain snapshot. The
//! composition layer registers them by name and routes reference them.

use super::state::DomainContext;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Pure predicate over a domain snapshot.
///
/// # Example
///
/// ```rust
/// use foresight::core::Guard;
///
/// #[derive(Clone, Debug, serde::Serialize)]
/// struct Issue {
///     failures: u32,
/// }
///
/// let too_many_failures = Guard::new(|issue: &Issue| issue.failures >= 3);
///
/// assert!(too_many_failures.check(&Issue { failures: 4 }));
/// assert!(!too_many_failures.check(&Issue { failures: 0 }));
/// ```
pub struct Guard<D: DomainContext> {
    predicate: Arc<dyn Fn(&D) -> bool + Send + Sync>,
    _phantom: PhantomData<D>,
}

impl<D: DomainContext> Guard<D> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and free of side effects.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&D) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
            _phantom: PhantomData,
        }
    }

    /// Evaluate the guard against a snapshot.
    pub fn check(&self, domain: &D) -> bool {
        (self.predicate)(domain)
    }
}

impl<D: DomainContext> Clone for Guard<D> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            _phantom: PhantomData,
        }
    }
}

impl<D: DomainContext> fmt::Debug for Guard<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}
