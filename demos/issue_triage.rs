//! Issue Triage
//!
//! This demo triages a tracker issue with the predict-execute-verify loop.
//!
//! Key concepts:
//! - A closed set of action types declared with `action_kind!`
//! - Predictions declared before every side effect
//! - One refresh per batch, verified against every prediction
//! - A domain `actionFailure` state that marks the issue blocked
//!
//! Run with: cargo run --example issue_triage
//! Set RUST_LOG=foresight=debug to see every transition.

use foresight::action::{Action, ActionDefinition, ActionError, ActionRegistry};
use foresight::action_kind;
use foresight::builder::{DomainState, MachineBuilder, RouteContext};
use foresight::prediction::{Check, Prediction};
use foresight::runner::{ContextError, ACTION_FAILURE, QUEUE_EMPTY};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use stillwater::prelude::*;
use tracing_subscriber::EnvFilter;

action_kind! {
    enum IssueAction {
        AddLabel,
        Comment,
        MarkBlocked,
    }
}

// Domain snapshot
#[derive(Clone, Debug, Serialize)]
struct Issue {
    number: u64,
    title: String,
    labels: Vec<String>,
    comments: usize,
    blocked: bool,
}

// In-memory stand-in for the issue tracker
#[derive(Clone)]
struct Tracker {
    issue: Arc<Mutex<Issue>>,
    reject_label: Option<String>,
}

impl Tracker {
    fn update(&self, apply: impl FnOnce(&mut Issue)) -> Result<Value, ActionError> {
        let mut issue = self
            .issue
            .lock()
            .map_err(|_| ActionError::Failed("tracker lock poisoned".to_string()))?;
        apply(&mut issue);
        Ok(json!({ "number": issue.number }))
    }

    fn fetch(&self) -> Result<Issue, ContextError> {
        self.issue
            .lock()
            .map(|issue| issue.clone())
            .map_err(|_| ContextError::Failed("tracker lock poisoned".to_string()))
    }
}

// Pure classification
fn classify(title: &str) -> Option<&'static str> {
    let title = title.to_lowercase();
    if title.contains("crash") || title.contains("panic") {
        Some("bug")
    } else if title.contains("add") || title.contains("support") {
        Some("enhancement")
    } else {
        None
    }
}

fn registry() -> ActionRegistry<IssueAction, Issue, Tracker> {
    ActionRegistry::from_catalog(|kind| match kind {
        IssueAction::AddLabel => ActionDefinition::new("Add a label", |action, _issue: &Issue| {
            let label = action
                .field("label")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            from_fn(move |tracker: &Tracker| {
                if tracker.reject_label.as_deref() == Some(label.as_str()) {
                    return Err(ActionError::Rejected(format!("label '{label}' is locked")));
                }
                tracker.update(|issue| issue.labels.push(label.clone()))
            })
            .boxed()
        })
        .predict(|action, _issue| {
            let label = action.field("label")?.clone();
            Some(Prediction::new(vec![Check::includes("labels", label)]))
        }),
        IssueAction::Comment => ActionDefinition::new("Post a comment", |_action, _issue: &Issue| {
            from_fn(|tracker: &Tracker| tracker.update(|issue| issue.comments += 1)).boxed()
        })
        .predict(|_action, issue| {
            Some(Prediction::new(vec![Check::gte(
                "comments",
                (issue.comments + 1) as f64,
            )]))
        }),
        IssueAction::MarkBlocked => {
            ActionDefinition::new("Mark the issue blocked", |_action, _issue: &Issue| {
                from_fn(|tracker: &Tracker| tracker.update(|issue| issue.blocked = true)).boxed()
            })
            .predict(|_action, _issue| Some(Prediction::new(vec![Check::eq("blocked", true)])))
        }
    })
}

fn triage(ctx: &RouteContext<'_, IssueAction, Issue>) -> Vec<Action<IssueAction>> {
    let issue = ctx.domain;
    match classify(&issue.title) {
        Some(label) if !issue.labels.iter().any(|l| l == label) => vec![
            Action::new(IssueAction::AddLabel, json!({ "label": label })),
            Action::new(
                IssueAction::Comment,
                json!({ "body": format!("Triaged as {label}") }),
            ),
        ],
        _ => vec![],
    }
}

fn block(ctx: &RouteContext<'_, IssueAction, Issue>) -> Vec<Action<IssueAction>> {
    match ctx.error {
        Some(_) => vec![Action::new(IssueAction::MarkBlocked, json!({}))],
        None => vec![],
    }
}

async fn run_triage(title: &str, reject_label: Option<&str>) {
    let issue = Issue {
        number: 42,
        title: title.to_string(),
        labels: Vec::new(),
        comments: 0,
        blocked: false,
    };
    let tracker = Tracker {
        issue: Arc::new(Mutex::new(issue.clone())),
        reject_label: reject_label.map(str::to_string),
    };

    let machine = MachineBuilder::new(registry())
        .initial("triage")
        .state(
            DomainState::routing("triage")
                .enqueue(triage)
                .route_if(QUEUE_EMPTY, "done")
                .route("executingQueue"),
        )
        .state(
            DomainState::routing(ACTION_FAILURE)
                .enqueue(block)
                .route("executingQueue"),
        )
        .refresh(|_issue: &Issue| from_fn(|tracker: &Tracker| tracker.fetch()).boxed())
        .after_queue(|batch| {
            let line = format!(
                "  [after_queue] {}: {} action(s), failed: {}",
                batch.label,
                batch.completed.len(),
                batch.error.is_some()
            );
            from_fn(move |_tracker: &Tracker| {
                println!("{line}");
                Ok(())
            })
            .boxed()
        })
        .label("triage")
        .build();

    let machine = match machine {
        Ok(machine) => machine,
        Err(e) => {
            println!("  Configuration error: {e}");
            return;
        }
    };

    match machine.run(issue, &tracker).await {
        Ok(report) => {
            println!("  {}", report.summary());
            println!("  Path: {}", report.history.state_names().join(" -> "));
            println!(
                "  Issue: labels={:?} comments={} blocked={}",
                report.domain.labels, report.domain.comments, report.domain.blocked
            );
        }
        Err(e) => println!("  Engine error: {e}"),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Issue Triage Example ===\n");

    println!("Triaging a crash report:");
    run_triage("App crashes on startup", None).await;

    println!("\nTriaging an issue that needs no label:");
    run_triage("Question about configuration", None).await;

    println!("\nTriaging with a locked label (failure handling):");
    run_triage("Add support for webhooks", Some("enhancement")).await;

    println!("\nKey Takeaways:");
    println!("- Every action declares what the tracker should look like afterwards");
    println!("- The tracker is refreshed once per batch and every prediction is checked");
    println!("- A failed action routes to actionFailure, which marks the issue blocked");

    println!("\n=== Example Complete ===");
}
