//! Property-based invariant tests for state merging and the state container.
//!
//! These tests verify invariants that must hold for any pair of state trees:
//!
//! 1. After a non-pruning merge, every key of the source reads back as the
//!    source's value (or a superset of it for nested objects).
//! 2. Keys present only in the target survive a non-pruning merge.
//! 3. A pruning merge leaves exactly the source's top-level key set.
//! 4. Merging a tree into itself is a no-op.
//! 5. Sequential updates with disjoint keys equal one combined update.
//! 6. `effective` always equals `initial` merged with `additional` after an
//!    init reload.
//! 7. Non-object payloads are always rejected without side effects.

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use tshell_state::{ApplicationStateContainer, StateError, StateTree, merge, merged};

// ── Helpers ─────────────────────────────────────────────────────────────

fn key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]).prop_map(str::to_string)
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-50i64..50).prop_map(|n| json!(n)),
        "[a-z]{0,4}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::btree_map(key(), inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn state_tree() -> impl Strategy<Value = StateTree> {
    prop::collection::btree_map(key(), value(), 0..5).prop_map(|m| m.into_iter().collect())
}

fn sorted_keys(tree: &StateTree) -> Vec<String> {
    let mut keys: Vec<String> = tree.keys().cloned().collect();
    keys.sort();
    keys
}

/// `actual` contains everything in `expected`, recursively for objects.
fn covers(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(a), Value::Object(e)) => e
            .iter()
            .all(|(k, v)| a.get(k).is_some_and(|av| covers(av, v))),
        _ => actual == expected,
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1-4. Merge algebra
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn source_values_take_precedence(a in state_tree(), b in state_tree()) {
        let out = merged(&a, &b);
        for (k, v) in &b {
            let got = out.get(k).expect("source key present");
            prop_assert!(covers(got, v), "key {k}: {got} does not cover {v}");
        }
    }

    #[test]
    fn target_only_keys_are_untouched(a in state_tree(), b in state_tree()) {
        let out = merged(&a, &b);
        for (k, v) in a.iter().filter(|(k, _)| !b.contains_key(*k)) {
            prop_assert_eq!(out.get(k), Some(v));
        }
    }

    #[test]
    fn pruning_merge_keeps_exact_source_keys(a in state_tree(), b in state_tree()) {
        let mut out = a.clone();
        merge(&mut out, &b, true);
        prop_assert_eq!(sorted_keys(&out), sorted_keys(&b));
    }

    #[test]
    fn pruning_merge_with_self_shape_is_identity(a in state_tree()) {
        let mut out = a.clone();
        merge(&mut out, &a, true);
        prop_assert_eq!(out, a);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-7. Container behavior
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn disjoint_updates_equal_combined_update(a in state_tree(), b in state_tree()) {
        let b: Map<String, Value> = b.into_iter().filter(|(k, _)| !a.contains_key(k)).collect();

        let mut stepwise = ApplicationStateContainer::new();
        stepwise.update(&Value::Object(a.clone())).unwrap();
        stepwise.update(&Value::Object(b.clone())).unwrap();

        let mut combined = ApplicationStateContainer::new();
        combined.update(&Value::Object(merged(&a, &b))).unwrap();

        prop_assert_eq!(stepwise.effective(), combined.effective());
    }

    #[test]
    fn init_reload_rebuilds_from_layers(
        base in state_tree(),
        updates in prop::collection::vec(state_tree(), 0..4),
        reload in state_tree(),
    ) {
        let mut container = ApplicationStateContainer::from_tree(base);
        for update in &updates {
            container.update(&Value::Object(update.clone())).unwrap();
        }
        container.reload(&Value::Object(reload), true).unwrap();

        let mut expected = container.initial().clone();
        merge(&mut expected, container.additional(), false);
        for (k, v) in container.additional() {
            prop_assert!(covers(&container.effective()[k], v));
        }
        prop_assert_eq!(sorted_keys(container.effective()), sorted_keys(&expected));
    }

    #[test]
    fn non_objects_are_rejected(base in state_tree(), bad in scalar()) {
        let mut container = ApplicationStateContainer::from_tree(base);
        let before = container.clone();
        prop_assert!(matches!(container.update(&bad), Err(StateError::InvalidState { .. })), "update must reject invalid state");
        prop_assert!(matches!(container.reload(&bad, true), Err(StateError::InvalidState { .. })), "reload must reject invalid state");
        prop_assert_eq!(container, before);
    }
}
