//! Descriptor de una transaction y su builder.
//!
//! Una `Transaction` agrupa: el esquema de options propio (como cualquier
//! contract), la lista ordenada de steps de nivel superior, el registro de
//! métodos (nombre → cuerpo) usado por los steps sin callable, la clave
//! opcional de "return option" y el tipo opcional del valor final.
//!
//! La herencia se expresa con `derive`: el builder hijo parte de copias de
//! todo lo anterior y puede agregar steps o reemplazar métodos sin tocar al
//! padre.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use super::execution::{Execution, Outcome};
use super::runner::Runner;
use crate::constants::is_reserved;
use crate::contract::{Contract, ContractSchema, ContractSchemaBuilder, Scope};
use crate::errors::FlowError;
use crate::event::InMemoryEventStore;
use crate::model::IntoContext;
use crate::signal::{Control, Flow, Output};
use crate::step::{StepDefinition, StepFn, StepsBuilder, With};
use crate::types::Type;

#[derive(Clone)]
pub struct Transaction {
    schema: ContractSchema,
    steps: Vec<StepDefinition>,
    methods: IndexMap<String, StepFn>,
    return_option: Option<String>,
    returns: Option<Type>,
}

impl Transaction {
    pub fn builder(name: impl Into<String>) -> TransactionBuilder {
        let name = name.into();
        TransactionBuilder { schema: ContractSchema::builder(name.clone()),
                             steps: StepsBuilder::new(name, Vec::new()),
                             methods: IndexMap::new(),
                             return_option: None,
                             returns: None,
                             error: None }
    }

    /// Builder hijo: copia options, steps, métodos y retorno del padre.
    pub fn derive(&self, name: impl Into<String>) -> TransactionBuilder {
        let name = name.into();
        TransactionBuilder { schema: self.schema.derive(name.clone()),
                             steps: StepsBuilder::new(name, self.steps.clone()),
                             methods: self.methods.clone(),
                             return_option: self.return_option.clone(),
                             returns: self.returns.clone(),
                             error: None }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn method(&self, name: &str) -> Option<&StepFn> {
        self.methods.get(name)
    }

    pub fn return_option(&self) -> Option<&str> {
        self.return_option.as_deref()
    }

    pub fn returns(&self) -> Option<&Type> {
        self.returns.as_ref()
    }

    /// `true` si algún step (a cualquier profundidad) se llama `name`.
    pub fn contains_step(&self, name: &str) -> bool {
        let mut found = false;
        for step in &self.steps {
            step.walk(&mut |s| found |= s.name() == name);
        }
        found
    }

    /// Construye el contexto (defaults inyectados, luego valores del caller)
    /// y valida los options de la transaction. Ningún step corre todavía.
    pub fn prepare(&self, initial: impl IntoContext) -> Result<Execution<'_>, FlowError> {
        let supplied = initial.into_context(self.name())?;
        let mut context = crate::model::Context::from(self.schema.injected().clone());
        context.merge(supplied);
        self.schema.validate(|key| context.get(key))?;
        Ok(Execution::new(self, context))
    }

    /// `prepare` + `call` sin overrides.
    pub fn invoke(&self, initial: impl IntoContext) -> Result<Outcome, FlowError> {
        self.prepare(initial)?.call()
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
         .field("schema", &self.schema)
         .field("steps", &self.steps)
         .field("methods", &self.methods.keys().collect::<Vec<_>>())
         .field("return_option", &self.return_option)
         .field("returns", &self.returns)
         .finish()
    }
}

/// Una transaction usada como step de otra: corre sus steps sobre el mismo
/// contexto compartido. Sus defaults inyectados se siembran sólo en las
/// claves ausentes. Un Return interno sólo detiene su propia ejecución; si no
/// lo hubo, los hijos declarados en el step (`nest`) corren a continuación.
/// El valor terminal (si existe) se entrega como `Output::Value`.
impl Contract for Transaction {
    fn schema(&self) -> &ContractSchema {
        &self.schema
    }

    fn call(&self, scope: &mut Scope<'_>) -> Flow {
        let context = scope.context_mut();
        for (key, value) in self.schema.injected() {
            if !context.has(key) {
                context.insert(key.clone(), value.clone());
            }
        }
        let runner = Runner::new(self, HashMap::new(), Box::new(InMemoryEventStore::default()));
        match runner.execute(&self.steps, scope.context_mut()) {
            Ok(()) => scope.run_nested()?,
            Err(Control::Halt(_)) => {}
            Err(fail) => return Err(fail),
        }
        match runner.terminal_value(scope.context()) {
            Some(value) => {
                runner.check_return(&value)?;
                Ok(Output::Value(value))
            }
            None => Ok(Output::Done),
        }
    }
}

pub struct TransactionBuilder {
    schema: ContractSchemaBuilder,
    steps: StepsBuilder,
    methods: IndexMap<String, StepFn>,
    return_option: Option<String>,
    returns: Option<Type>,
    error: Option<FlowError>,
}

impl TransactionBuilder {
    pub fn option(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.schema = self.schema.option(name, ty);
        self
    }

    pub fn option_any(mut self, name: impl Into<String>) -> Self {
        self.schema = self.schema.option_any(name);
        self
    }

    pub fn inject(mut self, defaults: Value) -> Self {
        self.schema = self.schema.inject(defaults);
        self
    }

    pub fn step(mut self, name: impl Into<String>, with: With) -> Self {
        self.steps = self.steps.step(name, with);
        self
    }

    /// Step resuelto al método registrado con el mismo nombre.
    pub fn method_step(mut self, name: impl Into<String>) -> Self {
        self.steps = self.steps.method_step(name);
        self
    }

    /// Step con hijos: `block` declara los steps que el cuerpo ejecuta con
    /// `Scope::run_nested`.
    pub fn nest<F>(mut self, name: impl Into<String>, with: With, block: F) -> Self
        where F: FnOnce(StepsBuilder) -> StepsBuilder
    {
        self.steps = self.steps.nest(name, with, block);
        self
    }

    /// Registra (o reemplaza, en un builder derivado) el método `name`.
    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
        where F: Fn(&mut Scope<'_>) -> Flow + Send + Sync + 'static
    {
        let name = name.into();
        if is_reserved(&name) {
            if self.error.is_none() {
                self.error = Some(FlowError::DuplicateOrReservedName { owner: self.schema.name().to_string(),
                                                                       name,
                                                                       reason: "the name is reserved".to_string() });
            }
            return self;
        }
        self.methods.insert(name, std::sync::Arc::new(body));
        self
    }

    /// Clave del contexto que se usa como valor final si ningún step emite
    /// un Return.
    pub fn return_option(mut self, key: impl Into<String>) -> Self {
        self.return_option = Some(key.into());
        self
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn build(self) -> Result<Transaction, FlowError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let schema = self.schema.build()?;
        let steps = self.steps.finish()?;
        let mut undefined = None;
        for step in &steps {
            step.walk(&mut |s| {
                    if undefined.is_none() && matches!(s.with(), With::Method) && !self.methods.contains_key(s.name()) {
                        undefined = Some(s.name().to_string());
                    }
                });
        }
        if let Some(step) = undefined {
            return Err(FlowError::UndefinedMethod { owner: schema.name().to_string(),
                                                    step });
        }
        Ok(Transaction { schema,
                         steps,
                         methods: self.methods,
                         return_option: self.return_option,
                         returns: self.returns })
    }
}
