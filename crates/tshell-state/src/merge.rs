#![forbid(unsafe_code)]

//! Recursive in-place merge of state trees.
//!
//! For each key `k` of `source` with value `v`:
//!
//! 1. equal scalars are skipped, leaving `target` untouched;
//! 2. two objects are merged recursively with the same `remove_absent` flag;
//! 3. an object or array in `source` is cloned into `target`, so the result
//!    never aliases `source`;
//! 4. any other value is assigned.
//!
//! Then, when `remove_absent` is set, keys of `target` missing from `source`
//! are removed at this level. Arrays are replaced wholesale, never merged
//! element-wise.

use serde_json::{Map, Value};

/// A nested JSON object: the unit of application state.
pub type StateTree = Map<String, Value>;

/// Merge `source` into `target` in place.
pub fn merge(target: &mut StateTree, source: &StateTree, remove_absent: bool) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge(existing, incoming, remove_absent);
            }
            (Some(existing), incoming) if is_scalar(incoming) && *existing == *incoming => {}
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }

    if remove_absent {
        target.retain(|key, _| source.contains_key(key));
    }
}

/// Merge `a` and `b` into a fresh tree without touching either input.
#[must_use]
pub fn merged(a: &StateTree, b: &StateTree) -> StateTree {
    let mut out = a.clone();
    merge(&mut out, b, false);
    out
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}
