//! Declarative predictions and their evaluator.
//!
//! An action may declare what the external system should look like after it
//! ran. After the batch is executed and the domain refreshed, the runner
//! evaluates those checks against the snapshot taken before the batch and
//! the refreshed one.
//!
//! # Example
//!
//! ```rust
//! use foresight::prediction::{evaluate, Check};
//! use serde_json::json;
//!
//! let checks = vec![Check::all(vec![
//!     Check::eq("status", "closed"),
//!     Check::includes("labels", "triaged"),
//! ])];
//!
//! let result = evaluate(
//!     Some(&checks),
//!     &json!({"status": "open", "labels": []}),
//!     &json!({"status": "closed", "labels": ["bug"]}),
//! );
//!
//! assert!(!result.pass);
//! assert_eq!(result.diffs.len(), 1);
//! assert_eq!(result.diffs[0].field, "labels");
//! ```

mod check;
mod evaluator;
mod path;

pub use check::{Check, Comparator, Prediction, Source};
pub use evaluator::{evaluate, evaluate_snapshots, Diff, Evaluation, NO_CHECKS_MESSAGE};
pub use path::resolve;
