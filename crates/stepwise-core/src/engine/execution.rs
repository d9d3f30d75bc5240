//! Ejecución preparada de una transaction.
//!
//! `Transaction::prepare` deja el contexto construido y validado; aquí se
//! registran overrides por step (sólo para esta ejecución) y, opcionalmente,
//! un `EventStore` propio. `call` consume la ejecución y devuelve un
//! `Outcome` con el valor terminal, el contexto final y la bitácora.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::runner::Runner;
use super::transaction::Transaction;
use crate::contract::Scope;
use crate::errors::FlowError;
use crate::event::{EventStore, InMemoryEventStore, RunEvent, RunEventKind};
use crate::model::Context;
use crate::signal::{Control, Flow};
use crate::step::StepFn;

/// Resultado de una ejecución completa.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub value: Value,
    pub context: Context,
    pub run_id: Uuid,
    pub events: Vec<RunEvent>,
}

pub struct Execution<'t> {
    transaction: &'t Transaction,
    context: Context,
    overrides: HashMap<String, StepFn>,
    store: Box<dyn EventStore>,
}

impl<'t> Execution<'t> {
    pub(crate) fn new(transaction: &'t Transaction, context: Context) -> Self {
        Self { transaction,
               context,
               overrides: HashMap::new(),
               store: Box::new(InMemoryEventStore::default()) }
    }

    /// Contexto inicial (defaults + valores del caller).
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Reemplaza el callable del step `step` (a cualquier profundidad) sólo
    /// en esta ejecución. Un nombre que no existe en el árbol se ignora.
    pub fn with_override<F>(mut self, step: impl Into<String>, body: F) -> Self
        where F: Fn(&mut Scope<'_>) -> Flow + Send + Sync + 'static
    {
        let step = step.into();
        if !self.transaction.contains_step(&step) {
            log::warn!("[{}] override for unknown step '{}' ignored", self.transaction.name(), step);
            return self;
        }
        self.overrides.insert(step, Arc::new(body));
        self
    }

    pub fn with_event_store(mut self, store: impl EventStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn call(self) -> Result<Outcome, FlowError> {
        let Execution { transaction,
                        mut context,
                        overrides,
                        store } = self;
        let runner = Runner::new(transaction, overrides, store);
        let run_id = runner.run_id();
        runner.record(RunEventKind::RunStarted { transaction: transaction.name().to_string(),
                                                 step_count: transaction.steps().len() });
        log::debug!("[{}] run {} started with {} keys", transaction.name(), run_id, context.len());

        match runner.execute(transaction.steps(), &mut context) {
            Ok(()) | Err(Control::Halt(_)) => {}
            Err(Control::Fail(err)) => {
                log::error!("[{}] run {} failed ({}): {}", transaction.name(), run_id, err.kind(), err);
                return Err(err);
            }
        }
        let value = runner.complete(&context).map_err(|err| {
                                                  log::error!("[{}] run {} failed ({}): {}",
                                                              transaction.name(),
                                                              run_id,
                                                              err.kind(),
                                                              err);
                                                  err
                                              })?;
        log::info!("[{}] run {} completed", transaction.name(), run_id);
        Ok(Outcome { value,
                     context,
                     run_id,
                     events: runner.events() })
    }
}
