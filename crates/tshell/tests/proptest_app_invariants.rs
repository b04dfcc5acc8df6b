//! Property-based invariant tests for state mutation through triggers.
//!
//! 1. The revision counts exactly the successful `update`/`reload` calls.
//! 2. Every key of the most recent update is visible with its value.
//! 3. An init reload leaves `effective` equal to `initial` overlaid with
//!    `additional`.

use proptest::prelude::*;
use serde_json::{Map, Value};
use tshell::prelude::*;
use tshell::state::merged;

#[derive(Debug, Clone)]
enum Op {
    Update(Map<String, Value>),
    Reload(Map<String, Value>, bool),
    Garbage,
}

fn small_map() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-d]", 0i64..5, 0..4)
        .prop_map(|m| m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => small_map().prop_map(Op::Update),
        2 => (small_map(), any::<bool>()).prop_map(|(m, init)| Op::Reload(m, init)),
        1 => Just(Op::Garbage),
    ]
}

proptest! {
    #[test]
    fn triggers_keep_state_consistent(ops in prop::collection::vec(op(), 0..24)) {
        let app = App::new(AppConfig::default()).unwrap();
        let _teardown = app.mount();
        let mut successes = 0u64;

        for op in ops {
            match op {
                Op::Update(map) => {
                    app.update(Value::Object(map.clone())).unwrap();
                    successes += 1;
                    let state = app.state();
                    for (key, value) in &map {
                        prop_assert_eq!(state.effective().get(key), Some(value));
                    }
                }
                Op::Reload(map, init) => {
                    app.reload(Value::Object(map), init).unwrap();
                    successes += 1;
                    if init {
                        let state = app.state();
                        let expected = merged(state.initial(), state.additional());
                        prop_assert_eq!(state.effective(), &expected);
                    }
                }
                Op::Garbage => {
                    prop_assert!(app.update(Value::from(7)).is_err());
                }
            }
            prop_assert_eq!(app.revision(), successes);
        }
    }
}
