//! Core engine types.
//!
//! This module contains the pure part of the engine:
//! - Machine states via the `State` trait
//! - Domain snapshots via the `DomainContext` trait
//! - Effect environments via the `Environment` trait
//! - Guard predicates over domain snapshots
//! - Immutable transition history

mod guard;
mod history;
mod state;

pub use guard::Guard;
pub use history::{StateHistory, StateTransition};
pub use state::{DomainContext, Environment, State};
