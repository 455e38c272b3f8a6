//! Static catalogue of action definitions.

use super::definition::ActionDefinition;
use super::kind::{Action, ActionKind};
use crate::core::{DomainContext, Environment};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while building or dispatching through a registry.
///
/// All of them are configuration errors: they are never retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    #[error("Action type '{0}' has no registered definition")]
    Unregistered(String),

    #[error("Unknown action type '{0}'")]
    UnknownType(String),

    #[error("Action type '{0}' registered more than once")]
    Duplicate(String),
}

/// A registry entry: the definition plus its own discriminant.
pub struct RegisteredAction<K: ActionKind, D: DomainContext, Env: Environment> {
    kind: K,
    definition: ActionDefinition<K, D, Env>,
}

impl<K: ActionKind, D: DomainContext, Env: Environment> RegisteredAction<K, D, Env> {
    pub fn kind(&self) -> K {
        self.kind
    }

    pub fn definition(&self) -> &ActionDefinition<K, D, Env> {
        &self.definition
    }

    /// Build an action of this type, stamping the discriminant.
    pub fn create(&self, payload: Value) -> Action<K> {
        Action::new(self.kind, payload)
    }
}

/// Maps every action type to exactly one definition.
///
/// Registration happens once at startup; the registry is immutable after.
///
/// # Example
///
/// ```rust
/// use foresight::action::{ActionDefinition, ActionRegistry};
/// use foresight::action_kind;
/// use serde_json::{json, Value};
/// use stillwater::prelude::*;
///
/// action_kind! {
///     pub enum IssueAction {
///         AddLabel,
///         Close,
///     }
/// }
///
/// #[derive(Clone, Debug, serde::Serialize)]
/// struct Issue {
///     status: String,
/// }
///
/// let registry: ActionRegistry<IssueAction, Issue, ()> =
///     ActionRegistry::from_catalog(|kind| match kind {
///         IssueAction::AddLabel => {
///             ActionDefinition::new("Add a label", |_a, _i: &Issue| pure(Value::Null).boxed())
///         }
///         IssueAction::Close => {
///             ActionDefinition::new("Close the issue", |_a, _i: &Issue| pure(Value::Null).boxed())
///         }
///     });
///
/// let action = registry.create(IssueAction::Close, json!({})).unwrap();
/// assert_eq!(registry.dispatch(&action).unwrap().definition().description(), "Close the issue");
/// ```
pub struct ActionRegistry<K: ActionKind, D: DomainContext, Env: Environment> {
    entries: HashMap<K, RegisteredAction<K, D, Env>>,
}

impl<K: ActionKind, D: DomainContext, Env: Environment> ActionRegistry<K, D, Env> {
    /// Build a complete registry from an exhaustive catalogue function.
    ///
    /// `define` is called once for every kind in `K::all()`.
    pub fn from_catalog<F>(define: F) -> Self
    where
        F: Fn(K) -> ActionDefinition<K, D, Env>,
    {
        let entries = K::all()
            .iter()
            .map(|&kind| {
                (
                    kind,
                    RegisteredAction {
                        kind,
                        definition: define(kind),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Build a registry from explicit pairs. Kinds may be left out; a kind
    /// given twice is rejected.
    pub fn with_definitions<I>(definitions: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, ActionDefinition<K, D, Env>)>,
    {
        let mut entries = HashMap::new();
        for (kind, definition) in definitions {
            if entries.contains_key(&kind) {
                return Err(RegistryError::Duplicate(kind.name().to_string()));
            }
            entries.insert(kind, RegisteredAction { kind, definition });
        }
        Ok(Self { entries })
    }

    pub fn get(&self, kind: K) -> Option<&RegisteredAction<K, D, Env>> {
        self.entries.get(&kind)
    }

    pub fn contains(&self, kind: K) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kinds declared by `K` that have no definition, in declaration order.
    pub fn missing_kinds(&self) -> Vec<K> {
        K::all()
            .iter()
            .copied()
            .filter(|kind| !self.entries.contains_key(kind))
            .collect()
    }

    /// Resolve the definition for an action.
    ///
    /// An unregistered type is a configuration error, never a silent no-op.
    pub fn dispatch(&self, action: &Action<K>) -> Result<&RegisteredAction<K, D, Env>, RegistryError> {
        self.entries
            .get(&action.kind())
            .ok_or_else(|| RegistryError::Unregistered(action.kind().name().to_string()))
    }

    /// Create an action of a registered type.
    pub fn create(&self, kind: K, payload: Value) -> Result<Action<K>, RegistryError> {
        self.get(kind)
            .map(|entry| entry.create(payload))
            .ok_or_else(|| RegistryError::Unregistered(kind.name().to_string()))
    }

    /// Create an action from its wire type name.
    pub fn parse(&self, type_name: &str, payload: Value) -> Result<Action<K>, RegistryError> {
        let kind =
            K::from_name(type_name).ok_or_else(|| RegistryError::UnknownType(type_name.to_string()))?;
        self.create(kind, payload)
    }

    /// Static description of an action's type.
    pub fn describe(&self, action: &Action<K>) -> Result<&str, RegistryError> {
        self.dispatch(action)
            .map(|entry| entry.definition().description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_kind;
    use serde::Serialize;
    use serde_json::json;
    use stillwater::prelude::*;

    action_kind! {
        enum PrAction {
            CreateBranch,
            PushCommit,
            RequestReview,
        }
    }

    #[derive(Clone, Debug, Serialize)]
    struct Pr {
        branch: Option<String>,
    }

    type Registry = ActionRegistry<PrAction, Pr, ()>;

    fn noop(description: &str) -> ActionDefinition<PrAction, Pr, ()> {
        ActionDefinition::new(description, |_a, _pr: &Pr| pure(Value::Null).boxed())
    }

    fn complete() -> Registry {
        ActionRegistry::from_catalog(|kind| match kind {
            PrAction::CreateBranch => noop("Create branch"),
            PrAction::PushCommit => noop("Push commit"),
            PrAction::RequestReview => noop("Request review"),
        })
    }

    #[test]
    fn catalog_registers_every_kind() {
        let registry = complete();

        assert_eq!(registry.len(), 3);
        assert!(registry.missing_kinds().is_empty());
        assert_eq!(
            registry.get(PrAction::PushCommit).map(|e| e.kind()),
            Some(PrAction::PushCommit)
        );
    }

    #[test]
    fn create_stamps_discriminant() {
        let registry = complete();
        let entry = registry.get(PrAction::CreateBranch).unwrap();

        let action = entry.create(json!({"name": "fix/42"}));
        assert_eq!(action.kind(), PrAction::CreateBranch);
        assert_eq!(action.field("name"), Some(&json!("fix/42")));
    }

    #[test]
    fn dispatch_of_unregistered_kind_fails_loudly() {
        let registry: Registry =
            ActionRegistry::with_definitions([(PrAction::CreateBranch, noop("Create branch"))])
                .unwrap();
        let action = Action::new(PrAction::PushCommit, json!({}));

        assert_eq!(
            registry.dispatch(&action).err(),
            Some(RegistryError::Unregistered("PushCommit".to_string()))
        );
        assert_eq!(
            registry.missing_kinds(),
            vec![PrAction::PushCommit, PrAction::RequestReview]
        );
        assert!(registry.create(PrAction::RequestReview, json!({})).is_err());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let result: Result<Registry, _> = ActionRegistry::with_definitions([
            (PrAction::CreateBranch, noop("first")),
            (PrAction::CreateBranch, noop("second")),
        ]);

        assert_eq!(
            result.err(),
            Some(RegistryError::Duplicate("CreateBranch".to_string()))
        );
    }

    #[test]
    fn parse_rejects_unknown_type_names() {
        let registry = complete();

        let action = registry.parse("RequestReview", json!({"reviewer": "octocat"})).unwrap();
        assert_eq!(registry.describe(&action), Ok("Request review"));

        assert_eq!(
            registry.parse("MergePr", json!({})).err(),
            Some(RegistryError::UnknownType("MergePr".to_string()))
        );
    }
}
