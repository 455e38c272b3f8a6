//! Foresight: a Predict-Execute-Verify task engine
//!
//! Foresight drives automated work against an external system by declaring,
//! before every side effect, what the system should look like afterwards,
//! and checking that it does. It follows Stillwater's "pure core,
//! imperative shell" philosophy: routing, prediction and evaluation are pure
//! functions, while every interaction with the outside world (executing an
//! action, refreshing or persisting the domain snapshot, bracketing a batch)
//! is an Effect supplied by the caller.
//!
//! # Core Concepts
//!
//! - **Actions**: a closed set of typed `{type, payload}` instructions, each
//!   with exactly one definition in an [`ActionRegistry`]
//! - **Predictions**: declarative checks over the domain snapshot, evaluated
//!   after a batch runs
//! - **Domain states**: named routing states that enqueue actions and pick
//!   the next state through guards
//! - **Runner**: the fixed batch lifecycle (execute, persist, refresh,
//!   verify) shared by every domain
//!
//! # Example
//!
//! ```rust
//! use foresight::action::{Action, ActionDefinition, ActionRegistry};
//! use foresight::action_kind;
//! use foresight::builder::{drain_state, MachineBuilder, RouteContext};
//! use foresight::prediction::{Check, Prediction};
//! use serde_json::{json, Value};
//! use stillwater::prelude::*;
//!
//! action_kind! {
//!     pub enum TicketAction {
//!         Close,
//!     }
//! }
//!
//! #[derive(Clone, Debug, serde::Serialize)]
//! struct Ticket {
//!     status: String,
//! }
//!
//! let registry: ActionRegistry<TicketAction, Ticket, ()> =
//!     ActionRegistry::from_catalog(|kind| match kind {
//!         TicketAction::Close => {
//!             ActionDefinition::new("Close the ticket", |_a, _t: &Ticket| pure(Value::Null).boxed())
//!                 .predict(|_a, _t| Some(Prediction::new(vec![Check::eq("status", "closed")])))
//!         }
//!     });
//!
//! fn close_open(ctx: &RouteContext<'_, TicketAction, Ticket>) -> Vec<Action<TicketAction>> {
//!     if ctx.domain.status == "open" {
//!         vec![Action::new(TicketAction::Close, json!({}))]
//!     } else {
//!         vec![]
//!     }
//! }
//!
//! let machine = MachineBuilder::new(registry)
//!     .initial("close")
//!     .state(drain_state("close", close_open))
//!     .refresh(|_t: &Ticket| pure(Ticket { status: "closed".to_string() }).boxed())
//!     .build()
//!     .unwrap();
//!
//! let report = tokio_test_block_on(machine.run(Ticket { status: "open".to_string() }, &()));
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! let report = report.unwrap();
//! assert_eq!(report.final_state, "done");
//! assert_eq!(report.verified_count(), 1);
//! ```

pub mod action;
pub mod builder;
pub mod config;
pub mod core;
pub mod prediction;
pub mod report;
pub mod runner;

// Re-export commonly used types
pub use action::{Action, ActionDefinition, ActionKind, ActionRegistry};
pub use builder::{BuildError, DomainState, MachineBuilder, MachineDefinition};
pub use config::EngineConfig;
pub use core::{DomainContext, Environment, Guard, State, StateHistory, StateTransition};
pub use prediction::{evaluate, Check, Prediction};
pub use report::{RunOutcome, RunReport};
pub use runner::{EngineError, MachineState, PevMachine, RunFailure, RunnerState};
