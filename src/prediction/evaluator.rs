//! Evaluation of checks against before/after snapshots.
//!
//! Leaf results are accumulated with Stillwater's `Validation`, so a failing
//! group reports every failing leaf inside it instead of stopping at the
//! first one.

use super::check::{Check, Comparator, Source};
use super::path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Message attached to evaluations that had nothing to check.
pub const NO_CHECKS_MESSAGE: &str = "no checks defined";

type CheckResult = Validation<(), NonEmptyVec<Diff>>;

/// One failing leaf check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub field: String,
    pub comparator: Comparator,
    pub expected: Value,
    /// Value found at `field`, `None` when the path did not resolve.
    pub actual: Option<Value>,
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(actual) => write!(
                f,
                "{}: expected {} {}, got {}",
                self.field, self.comparator, self.expected, actual
            ),
            None => write!(
                f,
                "{}: expected {} {}, field missing",
                self.field, self.comparator, self.expected
            ),
        }
    }
}

/// Outcome of evaluating a list of checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub pass: bool,
    pub diffs: Vec<Diff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Evaluation {
    fn no_checks() -> Self {
        Self {
            pass: true,
            diffs: Vec::new(),
            message: Some(NO_CHECKS_MESSAGE.to_string()),
        }
    }

    fn from_validation(result: CheckResult) -> Self {
        match result {
            Validation::Success(_) => Self {
                pass: true,
                diffs: Vec::new(),
                message: None,
            },
            Validation::Failure(diffs) => {
                let diffs: Vec<Diff> = diffs.iter().cloned().collect();
                Self {
                    pass: false,
                    message: Some(format!("{} check(s) failed", diffs.len())),
                    diffs,
                }
            }
        }
    }
}

struct Snapshots<'a> {
    before: &'a Value,
    after: &'a Value,
}

impl<'a> Snapshots<'a> {
    fn read(&self, source: Source) -> &'a Value {
        match source {
            Source::Before => self.before,
            Source::After => self.after,
        }
    }
}

/// Evaluate checks against serialized snapshots.
///
/// Absent or empty checks pass with [`NO_CHECKS_MESSAGE`]: an action without a
/// prediction is never a verification failure. A top-level list behaves like
/// an `all` group.
///
/// # Example
///
/// ```rust
/// use foresight::prediction::{evaluate, Check};
/// use serde_json::json;
///
/// let checks = vec![Check::subset("labels", vec!["a".into(), "b".into()])];
/// let before = json!({});
///
/// let ok = evaluate(Some(&checks), &before, &json!({"labels": ["a", "b", "c"]}));
/// assert!(ok.pass);
///
/// let missing = evaluate(Some(&checks), &before, &json!({"labels": ["a"]}));
/// assert!(!missing.pass);
/// assert_eq!(missing.diffs[0].actual, Some(json!(["a"])));
/// ```
pub fn evaluate(checks: Option<&[Check]>, before: &Value, after: &Value) -> Evaluation {
    let checks = match checks {
        Some(checks) if !checks.is_empty() => checks,
        _ => return Evaluation::no_checks(),
    };

    let snapshots = Snapshots { before, after };
    Evaluation::from_validation(check_all(checks, &snapshots))
}

/// Serialize two domain snapshots and evaluate checks against them.
pub fn evaluate_snapshots<D: Serialize>(
    checks: Option<&[Check]>,
    before: &D,
    after: &D,
) -> Result<Evaluation, serde_json::Error> {
    let before = serde_json::to_value(before)?;
    let after = serde_json::to_value(after)?;
    Ok(evaluate(checks, &before, &after))
}

fn check_all(checks: &[Check], snapshots: &Snapshots<'_>) -> CheckResult {
    if checks.is_empty() {
        return Validation::success(());
    }

    let results: Vec<CheckResult> = checks.iter().map(|c| check_one(c, snapshots)).collect();
    Validation::all_vec(results).map(|_| ())
}

fn check_any(checks: &[Check], snapshots: &Snapshots<'_>) -> CheckResult {
    if checks.is_empty() {
        return Validation::success(());
    }

    let results: Vec<CheckResult> = checks.iter().map(|c| check_one(c, snapshots)).collect();
    if results.iter().any(|r| r.is_success()) {
        Validation::success(())
    } else {
        Validation::all_vec(results).map(|_| ())
    }
}

fn check_one(check: &Check, snapshots: &Snapshots<'_>) -> CheckResult {
    match check {
        Check::All { checks } => check_all(checks, snapshots),
        Check::Any { checks } => check_any(checks, snapshots),
        Check::Eq {
            field,
            expected,
            from,
        } => leaf(field, Comparator::Eq, expected.clone(), snapshots.read(*from), |actual| {
            actual.is_some_and(|v| values_equal(v, expected))
        }),
        Check::Gte {
            field,
            expected,
            from,
        } => leaf(field, Comparator::Gte, Value::from(*expected), snapshots.read(*from), |actual| {
            actual
                .and_then(Value::as_f64)
                .is_some_and(|n| n >= *expected)
        }),
        Check::Lte {
            field,
            expected,
            from,
        } => leaf(field, Comparator::Lte, Value::from(*expected), snapshots.read(*from), |actual| {
            actual
                .and_then(Value::as_f64)
                .is_some_and(|n| n <= *expected)
        }),
        Check::Subset {
            field,
            expected,
            from,
        } => leaf(
            field,
            Comparator::Subset,
            Value::Array(expected.clone()),
            snapshots.read(*from),
            |actual| match actual {
                Some(Value::Array(items)) => expected
                    .iter()
                    .all(|e| items.iter().any(|item| values_equal(item, e))),
                _ => false,
            },
        ),
        Check::Includes {
            field,
            expected,
            from,
        } => leaf(
            field,
            Comparator::Includes,
            expected.clone(),
            snapshots.read(*from),
            |actual| match actual {
                Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, expected)),
                Some(Value::String(text)) => expected.as_str().is_some_and(|e| text.contains(e)),
                _ => false,
            },
        ),
        Check::Exists { field, from } => {
            leaf(field, Comparator::Exists, Value::Null, snapshots.read(*from), |actual| {
                actual.is_some_and(|v| !v.is_null())
            })
        }
        Check::StartsWith {
            field,
            expected,
            from,
        } => leaf(
            field,
            Comparator::StartsWith,
            Value::String(expected.clone()),
            snapshots.read(*from),
            |actual| {
                actual
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.starts_with(expected.as_str()))
            },
        ),
    }
}

/// Deep equality where numbers compare by value, so `2` equals `2.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn leaf<F>(
    field: &str,
    comparator: Comparator,
    expected: Value,
    snapshot: &Value,
    holds: F,
) -> CheckResult
where
    F: FnOnce(Option<&Value>) -> bool,
{
    let actual = path::resolve(snapshot, field);
    if holds(actual) {
        Validation::success(())
    } else {
        Validation::fail(Diff {
            field: field.to_string(),
            comparator,
            expected,
            actual: actual.cloned(),
        })
    }
}
