//! Typed actions and the registry that dispatches them.
//!
//! An action is a `{type, payload}` value whose type comes from a closed
//! enum implementing [`ActionKind`]. Each type has exactly one
//! [`ActionDefinition`] bundling its description, optional prediction,
//! required executor and optional custom verifier.

mod definition;
mod kind;
mod registry;

pub use definition::{
    ActionDefinition, ActionError, ExecuteFn, PredictFn, VerifyFn, VerifyInput, VerifyOutcome,
};
pub use kind::{Action, ActionKind};
pub use registry::{ActionRegistry, RegisteredAction, RegistryError};
