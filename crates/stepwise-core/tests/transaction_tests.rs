use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use stepwise_core::signal::{OptionSchema, Output};
use stepwise_core::contract::Returns;
use stepwise_core::{contract, types, Contract, FlowError, RunEventKind, Transaction, Type, With};

contract! {
    pub struct Split {
        options { sentence: types::string() }
        returns: OptionSchema::new().key("words", types::array_of(types::string()));
        call(_self, scope) {
            let sentence: String = scope.fetch("sentence")?;
            let words: Vec<&str> = sentence.split(' ').collect();
            scope.option(json!({ "words": words }))
        }
    }
}

contract! {
    pub struct Reverse {
        options { words: types::array_of(types::string()) }
        call(_self, scope) {
            let mut words: Vec<String> = scope.fetch("words")?;
            words.reverse();
            scope.option(json!({ "words": words }))
        }
    }
}

contract! {
    pub struct Join {
        options { words: types::array_of(types::string()) }
        call(_self, scope) {
            let words: Vec<String> = scope.fetch("words")?;
            scope.option(json!({ "sentence": words.join(" ") }))
        }
    }
}

fn reverse_sentence() -> Transaction {
    Transaction::builder("ReverseSentence").option("sentence", types::string())
                                           .step("split", With::contract(Split::new().unwrap()))
                                           .step("reverse", With::contract(Reverse::new().unwrap()))
                                           .step("join", With::contract(Join::new().unwrap()))
                                           .return_option("sentence")
                                           .build()
                                           .unwrap()
}

fn spy() -> (Arc<AtomicUsize>, With) {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = hits.clone();
    let with = With::function(move |_s| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(Output::Done)
    });
    (hits, with)
}

#[test]
fn sentence_is_split_reversed_and_joined() {
    let out = reverse_sentence().invoke(json!({ "sentence": "Hello World!" })).unwrap();
    assert_eq!(out.value, json!("World! Hello"));
    assert_eq!(out.context.get("words"), Some(&json!(["World!", "Hello"])));
}

#[test]
fn transaction_options_are_validated_before_any_step() {
    let err = reverse_sentence().invoke(json!({ "sentence": 1 })).unwrap_err();
    match err {
        FlowError::OptionTypeMismatch { owner, key, .. } => {
            assert_eq!(owner, "ReverseSentence");
            assert_eq!(key, "sentence");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn later_steps_observe_earlier_options() {
    let tx = Transaction::builder("Ordering").step("a", With::function(|s| s.option(json!({ "x": 1 }))))
                                             .step("b", With::function(|s| {
                                                       let x: i64 = s.fetch("x")?;
                                                       s.halt(x + 4)
                                                   }))
                                             .build()
                                             .unwrap();
    assert_eq!(tx.invoke(json!({})).unwrap().value, json!(5));
}

#[test]
fn return_in_the_middle_skips_remaining_siblings() {
    let (hits, third) = spy();
    let tx = Transaction::builder("Early").step("first", With::function(|s| s.option(json!({ "ran": true }))))
                                          .step("second", With::function(|s| s.halt(42)))
                                          .step("third", third)
                                          .build()
                                          .unwrap();
    let out = tx.invoke(json!({})).unwrap();
    assert_eq!(out.value, json!(42));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(!out.events
                .iter()
                .any(|e| matches!(&e.kind, RunEventKind::StepStarted { step, .. } if step == "third")));
    assert!(out.events
               .iter()
               .any(|e| matches!(&e.kind, RunEventKind::Halted { step, value } if step == "second" && *value == json!(42))));
}

#[test]
fn return_value_emitted_as_output_also_halts() {
    let (hits, after) = spy();
    let tx = Transaction::builder("Returned").step("stop", With::function(|_s| {
                                                   Ok(Output::Return(stepwise_core::ReturnValue::new("done")))
                                               }))
                                             .step("after", after)
                                             .build()
                                             .unwrap();
    assert_eq!(tx.invoke(json!({})).unwrap().value, json!("done"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn return_inside_nested_steps_stops_every_level() {
    let (inner_hits, inner_after) = spy();
    let (outer_hits, outer_after) = spy();
    let bracket_done = Arc::new(AtomicUsize::new(0));
    let flag = bracket_done.clone();
    let tx = Transaction::builder("Nested").method("bracket", move |s| {
                                                s.run_nested()?;
                                                flag.fetch_add(1, Ordering::SeqCst);
                                                Ok(Output::Done)
                                            })
                                           .nest("bracket", With::Method, |b| {
                                               b.step("inner", With::function(|s| s.halt(7)))
                                                .step("inner_after", inner_after)
                                           })
                                           .step("outer_after", outer_after)
                                           .build()
                                           .unwrap();
    let out = tx.invoke(json!({})).unwrap();
    assert_eq!(out.value, json!(7));
    assert_eq!(inner_hits.load(Ordering::SeqCst), 0);
    assert_eq!(outer_hits.load(Ordering::SeqCst), 0);
    assert_eq!(bracket_done.load(Ordering::SeqCst), 0);
}

#[test]
fn swallowed_nested_return_still_stops_siblings() {
    let (hits, sibling) = spy();
    let tx = Transaction::builder("Swallow").method("wrap", |s| {
                                                 let _ = s.run_nested();
                                                 Ok(Output::Done)
                                             })
                                            .nest("wrap", With::Method, |b| b.step("stop", With::function(|s| s.halt("first"))))
                                            .step("sibling", sibling)
                                            .build()
                                            .unwrap();
    let out = tx.invoke(json!({})).unwrap();
    assert_eq!(out.value, json!("first"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn nested_children_share_the_context_and_depth_is_tracked() {
    let tx = Transaction::builder("Depth").method("timed", |s| {
                                              s.run_nested()?;
                                              let total: i64 = s.fetch("total")?;
                                              s.option(json!({ "total": total * 2 }))
                                          })
                                          .nest("timed", With::Method, |b| {
                                              b.step("one", With::function(|s| s.option(json!({ "total": 1 }))))
                                               .step("two", With::function(|s| {
                                                         let total: i64 = s.fetch("total")?;
                                                         s.option(json!({ "total": total + 2 }))
                                                     }))
                                          })
                                          .return_option("total")
                                          .build()
                                          .unwrap();
    let out = tx.invoke(json!({})).unwrap();
    assert_eq!(out.value, json!(6));
    assert!(out.events
               .iter()
               .any(|e| matches!(&e.kind, RunEventKind::StepStarted { step, depth: 1, .. } if step == "two")));
}

#[test]
fn override_replaces_the_declared_callable() {
    let (hits, declared) = spy();
    let tx = Transaction::builder("Overridden").step("work", declared)
                                               .return_option("result")
                                               .build()
                                               .unwrap();
    let out = tx.prepare(json!({}))
                .unwrap()
                .with_override("work", |s| s.option(json!({ "result": "stubbed" })))
                .call()
                .unwrap();
    assert_eq!(out.value, json!("stubbed"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    // el plan declarado no cambia para la siguiente ejecución
    let err = tx.invoke(json!({})).unwrap_err();
    assert_eq!(err.kind(), "missing_return");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn override_wins_over_registered_method() {
    let tx = Transaction::builder("MethodOverride").method("compute", |s| s.halt("method"))
                                                   .method_step("compute")
                                                   .build()
                                                   .unwrap();
    let out = tx.prepare(json!({})).unwrap().with_override("compute", |s| s.halt("override")).call().unwrap();
    assert_eq!(out.value, json!("override"));
}

#[test]
fn missing_return_is_reported() {
    let tx = Transaction::builder("NoReturn").step("noop", With::function(|_s| Ok(Output::Done)))
                                             .build()
                                             .unwrap();
    let err = tx.invoke(json!({})).unwrap_err();
    assert_eq!(err, FlowError::MissingReturn { owner: "NoReturn".to_string() });
}

#[test]
fn declared_return_type_is_enforced() {
    let tx = Transaction::builder("Typed").step("words", With::function(|s| s.halt("not a flag")))
                                          .returns(types::boolean())
                                          .build()
                                          .unwrap();
    match tx.invoke(json!({})).unwrap_err() {
        FlowError::ReturnTypeMismatch { owner, value, expected } => {
            assert_eq!(owner, "Typed");
            assert_eq!(value, json!("not a flag"));
            assert_eq!(expected, "boolean");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn contract_step_return_shape_fails_fast() {
    contract! {
        struct BadSplit {
            returns: OptionSchema::new().key("words", types::array());
            call(_self, scope) {
                scope.option(json!({ "words": "not an array" }))
            }
        }
    }
    let (hits, after) = spy();
    let tx = Transaction::builder("FailFast").step("split", With::contract(BadSplit::new().unwrap()))
                                             .step("after", after)
                                             .build()
                                             .unwrap();
    let err = tx.invoke(json!({})).unwrap_err();
    assert_eq!(err.kind(), "option_type_mismatch");
    assert_eq!(err.owner(), "BadSplit");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn contract_step_sees_its_injected_defaults() {
    let tx = Transaction::builder("Defaults").step("split",
                                                   With::contract(Split::new().unwrap()
                                                                              .with_defaults(json!({ "sentence": "a b c" }))
                                                                              .unwrap()))
                                             .return_option("words")
                                             .build()
                                             .unwrap();
    let out = tx.invoke(json!({})).unwrap();
    assert_eq!(out.value, json!(["a", "b", "c"]));
    // los defaults no se escriben en el contexto compartido
    assert!(!out.context.has("sentence"));
}

#[test]
fn step_failures_abort_the_run() {
    let (hits, after) = spy();
    let tx = Transaction::builder("Failing").step("boom", With::function(|s| s.fail("disk full")))
                                            .step("after", after)
                                            .build()
                                            .unwrap();
    match tx.invoke(json!({})).unwrap_err() {
        FlowError::StepFailed { owner, step, message } => {
            assert_eq!(owner, "Failing");
            assert_eq!(step, "boom");
            assert_eq!(message, "disk full");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn derived_transaction_extends_without_touching_parent() {
    let parent = reverse_sentence();
    let child = parent.derive("ShoutedReverse")
                      .step("shout", With::function(|s| {
                                let sentence: String = s.fetch("sentence")?;
                                s.option(json!({ "sentence": sentence.to_uppercase() }))
                            }))
                      .build()
                      .unwrap();
    assert_eq!(parent.steps().len(), 3);
    assert_eq!(child.steps().len(), 4);
    assert_eq!(child.invoke(json!({ "sentence": "Hello World!" })).unwrap().value, json!("WORLD! HELLO"));
    assert_eq!(parent.invoke(json!({ "sentence": "Hello World!" })).unwrap().value, json!("World! Hello"));
}

#[test]
fn derived_transaction_may_replace_a_method() {
    let parent = Transaction::builder("Greeter").method("greet", |s| s.halt("hello"))
                                                .method_step("greet")
                                                .build()
                                                .unwrap();
    let child = parent.derive("LoudGreeter").method("greet", |s| s.halt("HELLO")).build().unwrap();
    assert_eq!(parent.invoke(json!({})).unwrap().value, json!("hello"));
    assert_eq!(child.invoke(json!({})).unwrap().value, json!("HELLO"));
}

#[test]
fn nested_transaction_return_does_not_end_the_outer_run() {
    let inner = Transaction::builder("Inner").step("stop", With::function(|s| s.halt(1)))
                                             .build()
                                             .unwrap();
    let (hits, after) = spy();
    let outer = Transaction::builder("Outer").step("inner", With::contract(inner))
                                             .step("after", after)
                                             .step("finish", With::function(|s| s.halt(2)))
                                             .build()
                                             .unwrap();
    assert_eq!(outer.invoke(json!({})).unwrap().value, json!(2));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn custom_types_plug_into_options() {
    let even = Type::new("even", |v| v.as_i64().is_some_and(|n| n % 2 == 0));
    let tx = Transaction::builder("Even").option("n", even)
                                         .step("half", With::function(|s| {
                                                   let n: i64 = s.fetch("n")?;
                                                   s.halt(n / 2)
                                               }))
                                         .build()
                                         .unwrap();
    assert_eq!(tx.invoke(json!({ "n": 8 })).unwrap().value, json!(4));
    match tx.invoke(json!({ "n": 3 })).unwrap_err() {
        FlowError::OptionTypeMismatch { value, expected, .. } => {
            assert_eq!(value, json!(3));
            assert_eq!(expected, "even");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn nested_transaction_reads_its_injected_defaults() {
    let inner = Transaction::builder("Inner").option("n", types::integer())
                                             .inject(json!({ "n": 5 }))
                                             .step("double", With::function(|s| {
                                                       let n: i64 = s.fetch("n")?;
                                                       s.option(json!({ "doubled": n * 2 }))
                                                   }))
                                             .return_option("doubled")
                                             .build()
                                             .unwrap();
    assert_eq!(inner.invoke(json!({})).unwrap().value, json!(10));

    let outer = Transaction::builder("Outer").step("inner", With::contract(inner.clone()))
                                             .return_option("doubled")
                                             .build()
                                             .unwrap();
    assert_eq!(outer.invoke(json!({})).unwrap().value, json!(10));

    // un valor ya presente en el contexto compartido gana sobre el default
    let seeded = Transaction::builder("Seeded").option("n", types::integer())
                                               .step("inner", With::contract(inner))
                                               .return_option("doubled")
                                               .build()
                                               .unwrap();
    assert_eq!(seeded.invoke(json!({ "n": 7 })).unwrap().value, json!(14));
}

#[test]
fn nested_transaction_runs_the_children_of_its_step() {
    let inner = Transaction::builder("Inner").step("first", With::function(|s| s.option(json!({ "trail": ["inner"] }))))
                                             .build()
                                             .unwrap();
    let outer = Transaction::builder("Outer").nest("inner", With::contract(inner), |b| {
                                                 b.step("child", With::function(|s| {
                                                      let mut trail: Vec<String> = s.fetch("trail")?;
                                                      trail.push("child".to_string());
                                                      s.option(json!({ "trail": trail }))
                                                  }))
                                             })
                                             .return_option("trail")
                                             .build()
                                             .unwrap();
    assert_eq!(outer.invoke(json!({})).unwrap().value, json!(["inner", "child"]));
}

#[test]
fn halted_nested_transaction_skips_the_children_of_its_step() {
    let inner = Transaction::builder("Inner").step("stop", With::function(|s| s.halt(1)))
                                             .build()
                                             .unwrap();
    let (hits, child) = spy();
    let outer = Transaction::builder("Outer").nest("inner", With::contract(inner), |b| b.step("child", child))
                                             .step("finish", With::function(|s| s.halt(2)))
                                             .build()
                                             .unwrap();
    assert_eq!(outer.invoke(json!({})).unwrap().value, json!(2));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

contract! {
    struct Verdict {
        options { answer: types::any() }
        returns: Returns::Return(types::boolean());
        call(_self, scope) {
            let answer = scope.get("answer").cloned().unwrap_or_default();
            scope.halt(answer)
        }
    }
}

#[test]
fn contract_step_halt_is_checked_against_declared_return() {
    let tx = Transaction::builder("Judge").step("verdict", With::contract(Verdict::new().unwrap()))
                                          .build()
                                          .unwrap();
    assert_eq!(tx.invoke(json!({ "answer": true })).unwrap().value, json!(true));
    match tx.invoke(json!({ "answer": "yes" })).unwrap_err() {
        FlowError::ReturnTypeMismatch { owner, value, expected } => {
            assert_eq!(owner, "Verdict");
            assert_eq!(value, json!("yes"));
            assert_eq!(expected, "Return<boolean>");
        }
        other => panic!("unexpected {other:?}"),
    }
}
