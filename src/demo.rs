//! Transaction de ejemplo usada por el binario `stepwise-demo`.
//!
//! `split → reverse → join` sobre la option `sentence`, envueltos en un
//! step `timed` (método) que ejecuta los hijos y registra la duración.
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};
use stepwise_core::signal::{OptionSchema, Output};
use stepwise_core::{contract, types, FlowError, Outcome, RunEventKind, Transaction, With};

use crate::config::DemoConfig;
use crate::errors::AppError;

contract! {
    /// Divide la oración en palabras.
    pub struct Split {
        options { sentence: types::string() }
        returns: OptionSchema::new().key("words", types::array_of(types::string()));
        call(_self, scope) {
            let sentence: String = scope.fetch("sentence")?;
            let words: Vec<&str> = sentence.split_whitespace().collect();
            scope.option(json!({ "words": words }))
        }
    }
}

contract! {
    /// Invierte el orden de las palabras.
    pub struct Reverse {
        options { words: types::array_of(types::string()) }
        returns: OptionSchema::new().key("words", types::array_of(types::string()));
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
        returns: OptionSchema::new().key("sentence", types::string());
        call(_self, scope) {
            let words: Vec<String> = scope.fetch("words")?;
            scope.option(json!({ "sentence": words.join(" ") }))
        }
    }
}

pub fn reverse_sentence() -> Result<Transaction, FlowError> {
    let split = Split::new()?;
    let reverse = Reverse::new()?;
    let join = Join::new()?;
    Transaction::builder("ReverseSentence").option("sentence", types::string())
                                           .method("timed", |scope| {
                                               let started = Instant::now();
                                               scope.run_nested()?;
                                               log::info!("[{}] nested steps took {:?}", scope.owner(), started.elapsed());
                                               Ok(Output::Done)
                                           })
                                           .nest("timed", With::Method, move |b| {
                                               b.step("split", With::contract(split))
                                                .step("reverse", With::contract(reverse))
                                                .step("join", With::contract(join))
                                           })
                                           .return_option("sentence")
                                           .returns(types::string())
                                           .build()
}

/// Resumen serializable de una ejecución.
#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub run_id: String,
    pub value: Value,
    pub steps: Vec<String>,
}

impl From<&Outcome> for DemoReport {
    fn from(outcome: &Outcome) -> Self {
        let steps = outcome.events
                           .iter()
                           .filter_map(|e| match &e.kind {
                               RunEventKind::StepStarted { step, .. } => Some(step.clone()),
                               _ => None,
                           })
                           .collect();
        Self { run_id: outcome.run_id.to_string(),
               value: outcome.value.clone(),
               steps }
    }
}

pub fn run(config: &DemoConfig) -> Result<Outcome, AppError> {
    let transaction = reverse_sentence()?;
    Ok(transaction.invoke(json!({ "sentence": config.sentence }))?)
}
