//! Propiedades del contexto y del orden de ejecución.

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{json, Value};
use stepwise_core::{Context, Output, Transaction, With};

fn patch_strategy() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-e]{1,2}", any::<i64>(), 0..8)
}

fn to_patch(map: &BTreeMap<String, i64>) -> Vec<(String, Value)> {
    map.iter().map(|(k, v)| (k.clone(), json!(v))).collect()
}

proptest! {
    #[test]
    fn merging_the_same_patch_twice_is_idempotent(base in patch_strategy(), patch in patch_strategy()) {
        let mut once = Context::from_iter(to_patch(&base));
        once.merge(to_patch(&patch));
        let mut twice = once.clone();
        twice.merge(to_patch(&patch));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_is_last_write_wins_and_keeps_other_keys(base in patch_strategy(), patch in patch_strategy()) {
        let mut ctx = Context::from_iter(to_patch(&base));
        ctx.merge(to_patch(&patch));
        for (key, value) in &patch {
            prop_assert_eq!(ctx.get(key).cloned(), Some(json!(value)));
        }
        for (key, value) in base.iter().filter(|(k, _)| !patch.contains_key(*k)) {
            prop_assert_eq!(ctx.get(key).cloned(), Some(json!(value)));
        }
    }

    #[test]
    fn halting_step_index_decides_the_result(count in 1usize..8, stop in 0usize..8) {
        let stop = stop % count;
        let mut builder = Transaction::builder("Chain");
        for i in 0..count {
            let with = if i == stop {
                With::function(move |s| s.halt(i as i64))
            } else {
                With::function(move |s| {
                    let mut patch = serde_json::Map::new();
                    patch.insert(format!("s{i}"), json!(true));
                    s.option(Value::Object(patch))
                })
            };
            builder = builder.step(format!("s{i}"), with);
        }
        let out = builder.build().unwrap().invoke(json!({})).unwrap();
        prop_assert_eq!(out.value, json!(stop as i64));
        // sólo los steps anteriores al halt fusionaron su Option
        for i in 0..count {
            prop_assert_eq!(out.context.has(&format!("s{i}")), i < stop);
        }
    }
}

#[test]
fn steps_without_signal_leave_the_context_untouched() {
    let tx = Transaction::builder("Quiet").step("noop", With::function(|_s| Ok(Output::Done)))
                                          .step("value", With::function(|_s| Ok(Output::Value(json!("ignored")))))
                                          .return_option("seed")
                                          .build()
                                          .unwrap();
    let out = tx.invoke(json!({ "seed": 1 })).unwrap();
    assert_eq!(out.value, json!(1));
    assert_eq!(out.context.len(), 1);
}
