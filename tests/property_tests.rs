//! Property-based tests for the check evaluator and run history.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated snapshots and check lists.

use chrono::Utc;
use foresight::core::{State, StateHistory, StateTransition};
use foresight::prediction::{evaluate, Check};
use foresight::runner::{MachineState, RunnerState};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

prop_compose! {
    fn snapshot()(fields in prop::collection::btree_map("[a-z]{1,6}", scalar(), 0..6)) -> Value {
        Value::Object(fields.into_iter().collect::<Map<String, Value>>())
    }
}

prop_compose! {
    fn arbitrary_state()(variant in 0..6u8, name in "[a-z]{1,8}") -> MachineState {
        match variant {
            0 => MachineState::domain(name),
            1 => MachineState::terminal(name),
            2 => MachineState::Runner(RunnerState::ExecutingQueue),
            3 => MachineState::Runner(RunnerState::VerifyingBatch),
            4 => MachineState::Runner(RunnerState::QueueComplete),
            _ => MachineState::Runner(RunnerState::Done),
        }
    }
}

/// One eq check per field, each either matching the snapshot or not.
fn eq_checks(after: &Value, mismatches: &[bool]) -> Vec<Check> {
    after
        .as_object()
        .map(|fields| {
            fields
                .iter()
                .zip(mismatches.iter().cycle())
                .map(|((field, value), &mismatch)| {
                    if mismatch {
                        Check::eq(field.clone(), json!({"not": value}))
                    } else {
                        Check::eq(field.clone(), value.clone())
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

proptest! {
    #[test]
    fn empty_checks_always_pass(before in snapshot(), after in snapshot()) {
        let result = evaluate(Some(&[]), &before, &after);
        prop_assert!(result.pass);
        prop_assert!(result.diffs.is_empty());
    }

    #[test]
    fn evaluation_is_deterministic(
        before in snapshot(),
        after in snapshot(),
        mismatches in prop::collection::vec(any::<bool>(), 1..4)
    ) {
        let checks = eq_checks(&after, &mismatches);
        let first = evaluate(Some(&checks), &before, &after);
        let second = evaluate(Some(&checks), &before, &after);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_failing_leaf_is_reported(
        after in snapshot(),
        mismatches in prop::collection::vec(any::<bool>(), 1..4)
    ) {
        let checks = eq_checks(&after, &mismatches);
        prop_assume!(!checks.is_empty());
        let failing = checks
            .iter()
            .zip(mismatches.iter().cycle())
            .filter(|(_, mismatch)| **mismatch)
            .count();

        let flat = evaluate(Some(&checks), &json!({}), &after);
        let grouped = evaluate(Some(&[Check::all(checks.clone())]), &json!({}), &after);

        prop_assert_eq!(flat.diffs.len(), failing);
        prop_assert_eq!(flat.pass, failing == 0);
        prop_assert_eq!(grouped, flat);
    }

    #[test]
    fn any_passes_iff_one_branch_passes(
        after in snapshot(),
        mismatches in prop::collection::vec(any::<bool>(), 1..4)
    ) {
        let checks = eq_checks(&after, &mismatches);
        prop_assume!(!checks.is_empty());
        let passing = checks
            .iter()
            .zip(mismatches.iter().cycle())
            .any(|(_, &mismatch)| !mismatch);

        let result = evaluate(Some(&[Check::any(checks.clone())]), &json!({}), &after);

        prop_assert_eq!(result.pass, passing);
        if passing {
            prop_assert!(result.diffs.is_empty());
        } else {
            prop_assert_eq!(result.diffs.len(), checks.len());
        }
    }

    #[test]
    fn default_source_ignores_before(before in snapshot(), after in snapshot()) {
        let checks = eq_checks(&after, &[false]);
        let result = evaluate(Some(&checks), &before, &after);
        prop_assert!(result.pass);
    }

    #[test]
    fn subset_of_labels_passes_and_missing_label_fails(
        labels in prop::collection::btree_set("[a-z]{1,6}", 1..6),
        take in 1..6usize
    ) {
        let labels: Vec<String> = labels.into_iter().collect();
        let expected: Vec<Value> = labels.iter().take(take).map(|l| json!(l)).collect();
        let check = Check::subset("labels", expected.clone());

        let full = evaluate(Some(&[check.clone()]), &json!({}), &json!({"labels": labels}));
        prop_assert!(full.pass);

        let remaining: Vec<&String> = labels.iter().skip(1).collect();
        let partial = evaluate(Some(&[check]), &json!({}), &json!({"labels": remaining}));
        prop_assert!(!partial.pass);
        prop_assert_eq!(partial.diffs[0].actual.clone(), Some(json!(remaining)));
    }

    #[test]
    fn gte_and_lte_bracket_numbers(value in -1_000i64..1_000, bound in -1_000i64..1_000) {
        let after = json!({"count": value});
        let gte = evaluate(Some(&[Check::gte("count", bound as f64)]), &json!({}), &after);
        let lte = evaluate(Some(&[Check::lte("count", bound as f64)]), &json!({}), &after);

        prop_assert_eq!(gte.pass, value >= bound);
        prop_assert_eq!(lte.pass, value <= bound);
        prop_assert!(gte.pass || lte.pass);
    }

    #[test]
    fn state_name_is_stable(state in arbitrary_state()) {
        let name1 = state.name().to_string();
        let name2 = state.to_string();
        prop_assert_eq!(name1, name2);
    }

    #[test]
    fn history_preserves_order(
        states in prop::collection::vec(arbitrary_state(), 1..10)
    ) {
        let mut history = StateHistory::new();
        let mut expected = vec![MachineState::domain("start")];

        for (i, to) in states.iter().enumerate() {
            let from = if i == 0 {
                MachineState::domain("start")
            } else {
                states[i - 1].clone()
            };

            history = history.record(StateTransition {
                from,
                to: to.clone(),
                timestamp: Utc::now(),
                cycle: i as u32,
            });
            expected.push(to.clone());
        }

        let path = history.get_path();
        prop_assert_eq!(path.len(), expected.len());
        for (state, expected) in path.iter().zip(&expected) {
            prop_assert_eq!(*state, expected);
        }
    }

    #[test]
    fn history_roundtrip_serialization(
        states in prop::collection::vec(arbitrary_state(), 0..5)
    ) {
        let mut history = StateHistory::new();
        for window in states.windows(2) {
            history = history.record(StateTransition {
                from: window[0].clone(),
                to: window[1].clone(),
                timestamp: Utc::now(),
                cycle: 0,
            });
        }

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory<MachineState> = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(history.state_names(), deserialized.state_names());
    }
}
