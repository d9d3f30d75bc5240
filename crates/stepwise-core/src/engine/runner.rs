//! Recorrido secuencial del árbol de steps de una transaction.
//!
//! El `Runner` mantiene el estado de una ejecución: overrides, slot del
//! valor terminal, profundidad actual y el store de eventos. `execute` es
//! reentrante: los cuerpos que anidan vuelven a entrar con `Scope::run_nested`
//! y todos los niveles comparten el mismo contexto y el mismo slot.
//!
//! Resolución del callable de cada step (en orden):
//! 1. override registrado para el nombre del step;
//! 2. método registrado en la transaction (`With::Method`);
//! 3. función (`With::Function`);
//! 4. contract (`With::Contract`), con validación de options y retorno.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::transaction::Transaction;
use crate::contract::{Contract, Nested, Scope};
use crate::errors::FlowError;
use crate::event::{EventStore, RunEvent, RunEventKind};
use crate::model::Context;
use crate::signal::{Control, Flow, Output, ReturnValue};
use crate::step::{StepDefinition, StepFn, With};

pub(crate) struct Runner<'t> {
    transaction: &'t Transaction,
    overrides: HashMap<String, StepFn>,
    run_id: Uuid,
    terminal: RefCell<Option<ReturnValue>>,
    depth: Cell<usize>,
    seq: Cell<u64>,
    store: RefCell<Box<dyn EventStore>>,
}

impl<'t> Runner<'t> {
    pub(crate) fn new(transaction: &'t Transaction,
                      overrides: HashMap<String, StepFn>,
                      store: Box<dyn EventStore>)
                      -> Self {
        Self { transaction,
               overrides,
               run_id: Uuid::new_v4(),
               terminal: RefCell::new(None),
               depth: Cell::new(0),
               seq: Cell::new(0),
               store: RefCell::new(store) }
    }

    pub(crate) fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub(crate) fn record(&self, kind: RunEventKind) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.store.borrow_mut().append(RunEvent { seq,
                                                  run_id: self.run_id,
                                                  kind,
                                                  ts: Utc::now() });
    }

    pub(crate) fn events(&self) -> Vec<RunEvent> {
        self.store.borrow().events(self.run_id)
    }

    fn is_halted(&self) -> bool {
        self.terminal.borrow().is_some()
    }

    /// Ejecuta `steps` en orden sobre `context`. Un Return (devuelto o
    /// propagado) ocupa el slot terminal y vuelve como `Err(Control::Halt)`
    /// para desenrollar los cuerpos que anidan. Si el slot ya estaba ocupado
    /// (un cuerpo ignoró el Halt de un hijo) no se ejecuta ningún step más.
    pub(crate) fn execute(&self, steps: &[StepDefinition], context: &mut Context) -> Result<(), Control> {
        for step in steps {
            if self.is_halted() {
                break;
            }
            let depth = self.depth.get();
            log::debug!("[{}] step '{}' ({:?}) depth={}", self.transaction.name(), step.name(), step.kind(), depth);
            self.record(RunEventKind::StepStarted { step: step.name().to_string(),
                                                    kind: self.resolved_kind(step),
                                                    depth });
            self.depth.set(depth + 1);
            let produced = self.evaluate(step, context);
            self.depth.set(depth);
            match produced {
                Ok(output) => self.absorb(step, output, context)?,
                Err(Control::Halt(ret)) => {
                    self.settle(step, ret.clone());
                    return Err(Control::Halt(ret));
                }
                Err(fail) => return Err(fail),
            }
        }
        match self.terminal.borrow().clone() {
            Some(ret) => Err(Control::Halt(ret)),
            None => Ok(()),
        }
    }

    fn resolved_kind(&self, step: &StepDefinition) -> crate::step::StepKind {
        if self.overrides.contains_key(step.name()) {
            crate::step::StepKind::Override
        } else {
            step.kind()
        }
    }

    fn evaluate(&self, step: &StepDefinition, context: &mut Context) -> Flow {
        let nested = step.is_yielding().then(|| Nested { runner: self,
                                                         steps: step.children() });
        let owner = self.transaction.name();
        let schema = self.transaction.schema();
        if let Some(body) = self.overrides.get(step.name()) {
            let mut scope = Scope::new(owner, context).for_step(step.name()).with_schema(schema).with_nested(nested);
            return body(&mut scope);
        }
        match step.with() {
            With::Method => {
                let body = self.transaction.method(step.name()).ok_or_else(|| {
                                                                   FlowError::UndefinedMethod { owner: owner.to_string(),
                                                                                                step: step.name().to_string() }
                                                               })?;
                let mut scope = Scope::new(owner, context).for_step(step.name()).with_schema(schema).with_nested(nested);
                body(&mut scope)
            }
            With::Function(body) => {
                let mut scope = Scope::new(owner, context).for_step(step.name()).with_schema(schema).with_nested(nested);
                body(&mut scope)
            }
            With::Contract(contract) => self.invoke_contract(contract.as_ref(), step, nested, context),
        }
    }

    /// Un contract usado como step valida sus options contra el contexto
    /// compartido (con sus defaults por debajo) y su salida contra el retorno
    /// declarado.
    fn invoke_contract(&self,
                       contract: &dyn Contract,
                       step: &StepDefinition,
                       nested: Option<Nested<'_>>,
                       context: &mut Context)
                       -> Flow {
        let schema = contract.schema();
        let mut scope = Scope::new(schema.name(), context).for_step(step.name())
                                                          .with_schema(schema)
                                                          .with_defaults(schema.injected())
                                                          .with_nested(nested);
        schema.validate(|key| scope.get(key))?;
        match contract.call(&mut scope) {
            Ok(output) => {
                schema.check_output(&output)?;
                Ok(output)
            }
            Err(Control::Halt(ret)) => {
                schema.check_halt(&ret)?;
                Err(Control::Halt(ret))
            }
            Err(fail) => Err(fail),
        }
    }

    fn absorb(&self, step: &StepDefinition, output: Output, context: &mut Context) -> Result<(), Control> {
        match output {
            Output::Option(option) => {
                let keys: Vec<String> = option.value().keys().cloned().collect();
                context.merge(option.into_inner());
                self.record(RunEventKind::OptionMerged { step: step.name().to_string(),
                                                         keys });
                Ok(())
            }
            Output::Return(ret) => {
                self.settle(step, ret.clone());
                Err(Control::Halt(ret))
            }
            Output::Value(_) | Output::Done => Ok(()),
        }
    }

    /// El primer Return gana; los posteriores (de cuerpos que atraparon el
    /// Halt de un hijo) se ignoran.
    fn settle(&self, step: &StepDefinition, ret: ReturnValue) {
        let mut slot = self.terminal.borrow_mut();
        if slot.is_some() {
            return;
        }
        log::debug!("[{}] step '{}' returned {}", self.transaction.name(), step.name(), ret.value());
        self.record(RunEventKind::Halted { step: step.name().to_string(),
                                           value: ret.value().clone() });
        *slot = Some(ret);
    }

    /// Valor terminal: el Return si lo hubo, si no el valor de la return
    /// option en el contexto final.
    pub(crate) fn terminal_value(&self, context: &Context) -> Option<Value> {
        if let Some(ret) = self.terminal.borrow().as_ref() {
            return Some(ret.value().clone());
        }
        self.transaction.return_option().and_then(|key| context.get(key)).cloned()
    }

    pub(crate) fn check_return(&self, value: &Value) -> Result<(), FlowError> {
        match self.transaction.returns() {
            Some(ty) if !ty.check(value) => {
                Err(FlowError::ReturnTypeMismatch { owner: self.transaction.name().to_string(),
                                                    value: value.clone(),
                                                    expected: ty.name().to_string() })
            }
            _ => Ok(()),
        }
    }

    /// Cierre de una ejecución de nivel superior.
    pub(crate) fn complete(&self, context: &Context) -> Result<Value, FlowError> {
        let value = self.terminal_value(context)
                        .ok_or_else(|| FlowError::MissingReturn { owner: self.transaction.name().to_string() })?;
        self.check_return(&value)?;
        self.record(RunEventKind::RunCompleted { value: value.clone() });
        Ok(value)
    }
}
