//! Per-type action behaviour: describe, predict, execute, verify.

use super::kind::{Action, ActionKind};
use crate::core::{DomainContext, Environment};
use crate::prediction::Prediction;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use stillwater::effect::BoxedEffect;
use thiserror::Error;

/// Error returned by an action's `execute` effect.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    #[error("{0}")]
    Failed(String),

    #[error("Backend rejected request: {0}")]
    Rejected(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<serde_json::Error> for ActionError {
    fn from(err: serde_json::Error) -> Self {
        ActionError::InvalidPayload(err.to_string())
    }
}

/// Result of a custom `verify` function.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifyOutcome {
    pub pass: bool,
    pub message: Option<String>,
}

impl VerifyOutcome {
    pub fn pass() -> Self {
        Self {
            pass: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            pass: false,
            message: Some(message.into()),
        }
    }
}

/// Everything a custom `verify` function may inspect.
pub struct VerifyInput<'a, K: ActionKind, D> {
    pub action: &'a Action<K>,
    /// Snapshot the batch was predicted and executed against.
    pub old: &'a D,
    /// Refreshed snapshot.
    pub new: &'a D,
    pub prediction: Option<&'a Prediction>,
    pub result: Option<&'a Value>,
}

pub type PredictFn<K, D> = Arc<dyn Fn(&Action<K>, &D) -> Option<Prediction> + Send + Sync>;

/// Factory producing a fresh execute effect for each invocation.
pub type ExecuteFn<K, D, Env> =
    Arc<dyn Fn(&Action<K>, &D) -> BoxedEffect<Value, ActionError, Env> + Send + Sync>;

pub type VerifyFn<K, D> =
    Arc<dyn Fn(&VerifyInput<'_, K, D>) -> Option<VerifyOutcome> + Send + Sync>;

/// Behaviour bundle for one action type.
///
/// `execute` is taken by the constructor, so a definition without an
/// executor cannot be built.
pub struct ActionDefinition<K: ActionKind, D: DomainContext, Env: Environment> {
    description: String,
    predict: Option<PredictFn<K, D>>,
    execute: ExecuteFn<K, D, Env>,
    verify: Option<VerifyFn<K, D>>,
}

impl<K: ActionKind, D: DomainContext, Env: Environment> ActionDefinition<K, D, Env> {
    pub fn new<F>(description: impl Into<String>, execute: F) -> Self
    where
        F: Fn(&Action<K>, &D) -> BoxedEffect<Value, ActionError, Env> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predict: None,
            execute: Arc::new(execute),
            verify: None,
        }
    }

    /// Declare expected postconditions (optional).
    pub fn predict<F>(mut self, predict: F) -> Self
    where
        F: Fn(&Action<K>, &D) -> Option<Prediction> + Send + Sync + 'static,
    {
        self.predict = Some(Arc::new(predict));
        self
    }

    /// Add custom verification beyond declarative checks (optional).
    pub fn verify<F>(mut self, verify: F) -> Self
    where
        F: Fn(&VerifyInput<'_, K, D>) -> Option<VerifyOutcome> + Send + Sync + 'static,
    {
        self.verify = Some(Arc::new(verify));
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn has_verify(&self) -> bool {
        self.verify.is_some()
    }

    /// Collect the prediction for an action (pure).
    pub fn prediction_for(&self, action: &Action<K>, domain: &D) -> Option<Prediction> {
        self.predict.as_ref().and_then(|p| p(action, domain))
    }

    /// Build the execute effect for an action.
    pub fn execution_for(
        &self,
        action: &Action<K>,
        domain: &D,
    ) -> BoxedEffect<Value, ActionError, Env> {
        (self.execute)(action, domain)
    }

    /// Run the custom verifier; `None` when there is none or it has no opinion.
    pub fn custom_verify(&self, input: &VerifyInput<'_, K, D>) -> Option<VerifyOutcome> {
        self.verify.as_ref().and_then(|v| v(input))
    }
}

impl<K: ActionKind, D: DomainContext, Env: Environment> Clone for ActionDefinition<K, D, Env> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            predict: self.predict.clone(),
            execute: Arc::clone(&self.execute),
            verify: self.verify.clone(),
        }
    }
}

impl<K: ActionKind, D: DomainContext, Env: Environment> fmt::Debug for ActionDefinition<K, D, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("description", &self.description)
            .field("predict", &self.predict.is_some())
            .field("verify", &self.verify.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_kind;
    use crate::prediction::Check;
    use serde::Serialize;
    use serde_json::json;
    use stillwater::prelude::*;

    action_kind! {
        enum TicketAction {
            Close,
        }
    }

    #[derive(Clone, Debug, Serialize)]
    struct Ticket {
        status: String,
    }

    #[derive(Clone)]
    struct Services;

    fn ticket(status: &str) -> Ticket {
        Ticket {
            status: status.to_string(),
        }
    }

    fn close_definition() -> ActionDefinition<TicketAction, Ticket, Services> {
        ActionDefinition::new("Close the ticket", |_action, _ticket: &Ticket| {
            pure(json!({"closed": true})).boxed()
        })
        .predict(|_action, ticket| {
            (ticket.status != "closed")
                .then(|| Prediction::new(vec![Check::eq("status", "closed")]))
        })
        .verify(|input| {
            let closed = input.result.and_then(|r| r.get("closed")) == Some(&json!(true));
            (!closed).then(|| VerifyOutcome::fail("execute did not report closing"))
        })
    }

    #[test]
    fn predict_is_optional_and_pure() {
        let definition = close_definition();
        let action = Action::new(TicketAction::Close, json!({}));

        assert!(definition.prediction_for(&action, &ticket("open")).is_some());
        assert!(definition.prediction_for(&action, &ticket("closed")).is_none());

        let bare: ActionDefinition<TicketAction, Ticket, Services> =
            ActionDefinition::new("noop", |_a, _t: &Ticket| pure(Value::Null).boxed());
        assert!(bare.prediction_for(&action, &ticket("open")).is_none());
        assert!(!bare.has_verify());
    }

    #[test]
    fn custom_verify_inspects_execute_result() {
        let definition = close_definition();
        let action = Action::new(TicketAction::Close, json!({}));
        let old = ticket("open");
        let new = ticket("closed");
        let result = json!({"closed": false});

        let outcome = definition.custom_verify(&VerifyInput {
            action: &action,
            old: &old,
            new: &new,
            prediction: None,
            result: Some(&result),
        });

        assert_eq!(
            outcome,
            Some(VerifyOutcome::fail("execute did not report closing"))
        );
    }

    #[tokio::test]
    async fn execution_produces_fresh_effect_each_time() {
        let definition = close_definition();
        let action = Action::new(TicketAction::Close, json!({}));

        let first = definition
            .execution_for(&action, &ticket("open"))
            .run(&Services)
            .await
            .unwrap();
        let second = definition
            .execution_for(&action, &ticket("open"))
            .run(&Services)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(definition.description(), "Close the ticket");
    }
}
