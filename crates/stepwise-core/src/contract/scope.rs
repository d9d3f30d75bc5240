use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ContractSchema;
use crate::engine::runner::Runner;
use crate::errors::FlowError;
use crate::model::Context;
use crate::signal::{self, Control, Flow, OptionSchema, OptionValue, Output};
use crate::step::StepDefinition;

/// Continuación hacia los steps hijos (`yielding`) de un step.
#[derive(Clone, Copy)]
pub(crate) struct Nested<'a> {
    pub(crate) runner: &'a Runner<'a>,
    pub(crate) steps: &'a [StepDefinition],
}

/// Vista que recibe el cuerpo de un contract o step: accesores sobre el
/// contexto compartido, emisión de señales y la continuación anidada.
pub struct Scope<'a> {
    owner: &'a str,
    step: Option<&'a str>,
    context: &'a mut Context,
    schema: Option<&'a ContractSchema>,
    defaults: Option<&'a IndexMap<String, Value>>,
    nested: Option<Nested<'a>>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(owner: &'a str, context: &'a mut Context) -> Self {
        Self { owner,
               step: None,
               context,
               schema: None,
               defaults: None,
               nested: None }
    }

    pub(crate) fn for_step(mut self, step: &'a str) -> Self {
        self.step = Some(step);
        self
    }

    /// Esquema del dueño; `fetch` lo usa para describir la forma esperada.
    pub(crate) fn with_schema(mut self, schema: &'a ContractSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Los defaults inyectados del contract se leen por debajo del contexto
    /// compartido, sin escribirse en él.
    pub(crate) fn with_defaults(mut self, defaults: &'a IndexMap<String, Value>) -> Self {
        if !defaults.is_empty() {
            self.defaults = Some(defaults);
        }
        self
    }

    pub(crate) fn with_nested(mut self, nested: Option<Nested<'a>>) -> Self {
        self.nested = nested;
        self
    }

    /// Contract o transaction dueño de este cuerpo.
    pub fn owner(&self) -> &str {
        self.owner
    }

    /// Nombre del step en ejecución (si corre dentro de una transaction).
    pub fn step(&self) -> Option<&str> {
        self.step
    }

    /// Accesor de valor.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key).or_else(|| self.defaults.and_then(|d| d.get(key)))
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Accesor de presencia: existe y no es `null` ni `false`.
    pub fn present(&self, key: &str) -> bool {
        !matches!(self.get(key), None | Some(Value::Null) | Some(Value::Bool(false)))
    }

    /// Lee y deserializa `key`.
    ///
    /// Un valor de un option declarado que no se deja leer es
    /// `OptionTypeMismatch` con la forma declarada; cualquier otro fallo de
    /// lectura (clave ausente o no declarada) es `StepFailed`.
    pub fn fetch<T: DeserializeOwned>(&self, key: &str) -> Result<T, FlowError> {
        let Some(value) = self.get(key) else {
            return Err(self.failure(format!("`{key}` is not set in the context")));
        };
        serde_json::from_value(value.clone()).map_err(|err| {
                                                 match self.schema.and_then(|s| s.option(key)) {
                                                     Some(parameter) => {
                                                         FlowError::OptionTypeMismatch { owner: self.owner.to_string(),
                                                                                         key: key.to_string(),
                                                                                         value: value.clone(),
                                                                                         expected: parameter.expected().to_string() }
                                                     }
                                                     None => self.failure(format!("`{key}` holds {value}, which cannot be read: {err}")),
                                                 }
                                             })
    }

    fn failure(&self, message: String) -> FlowError {
        FlowError::StepFailed { owner: self.owner.to_string(),
                                step: self.step.unwrap_or(self.owner).to_string(),
                                message }
    }

    pub fn context(&self) -> &Context {
        &*self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut *self.context
    }

    /// Ejecuta los steps hijos contra el mismo contexto. Sin hijos no hace
    /// nada. Un Return en un hijo vuelve como `Err(Control::Halt)`; propagarlo
    /// con `?` desenrolla el resto del cuerpo.
    pub fn run_nested(&mut self) -> Result<(), Control> {
        let Some(nested) = self.nested else {
            return Ok(());
        };
        nested.runner.execute(nested.steps, &mut *self.context)
    }

    /// `true` si hay steps hijos declarados.
    pub fn has_nested(&self) -> bool {
        self.nested.is_some_and(|n| !n.steps.is_empty())
    }

    /// Emite un Option; `patch` debe ser un objeto JSON.
    pub fn option(&self, patch: Value) -> Flow {
        signal::option(self.owner, patch)
    }

    /// Option tipado: cada clave de `schema` debe pasar su predicado.
    pub fn option_checked(&self, patch: Value, schema: &OptionSchema) -> Flow {
        Ok(Output::Option(OptionValue::checked(self.owner, patch, schema)?))
    }

    /// Emite un Return: termina toda la ejecución con `value`.
    pub fn halt(&self, value: impl Into<Value>) -> Flow {
        signal::halt(value)
    }

    /// Falla el step con un mensaje.
    pub fn fail(&self, message: impl Into<String>) -> Flow {
        Err(Control::Fail(self.failure(message.into())))
    }
}
