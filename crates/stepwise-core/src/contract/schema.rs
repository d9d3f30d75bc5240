//! Descriptor declarativo de un contract.
//!
//! `ContractSchema` reemplaza la declaración "a nivel de clase": se construye
//! una vez con `ContractSchema::builder` y se adjunta al tipo concreto. La
//! herencia se expresa con `derive`, que parte de una copia del padre; el
//! hijo agrega declaraciones sin tocar al padre.

use indexmap::IndexMap;
use serde_json::Value;

use super::parameter::Parameter;
use crate::constants::{is_reserved, CONTEXT_KEY};
use crate::errors::FlowError;
use crate::signal::{OptionSchema, Output, ReturnValue};
use crate::types::Type;

/// Forma de retorno declarada.
#[derive(Debug, Clone)]
pub enum Returns {
    /// El valor plano producido debe pasar el tipo.
    Value(Type),
    /// Debe producirse un Option cuyo patch cumpla el esquema.
    Option(OptionSchema),
    /// Debe producirse un Return cuyo valor pase el tipo.
    Return(Type),
}

impl From<Type> for Returns {
    fn from(ty: Type) -> Self {
        Returns::Value(ty)
    }
}

impl From<OptionSchema> for Returns {
    fn from(schema: OptionSchema) -> Self {
        Returns::Option(schema)
    }
}

impl Returns {
    pub fn describe(&self) -> String {
        match self {
            Returns::Value(ty) => ty.name().to_string(),
            Returns::Option(schema) => schema.describe(),
            Returns::Return(ty) => format!("Return<{}>", ty.name()),
        }
    }

    pub(crate) fn check(&self, owner: &str, output: &Output) -> Result<(), FlowError> {
        let passed = match (self, output) {
            (Returns::Value(ty), Output::Value(v)) => ty.check(v),
            (Returns::Value(ty), Output::Done) => ty.check(&Value::Null),
            (Returns::Option(schema), Output::Option(option)) => return schema.check(owner, option),
            (Returns::Return(ty), Output::Return(ret)) => ty.check(ret.value()),
            _ => false,
        };
        if passed {
            Ok(())
        } else {
            Err(FlowError::ReturnTypeMismatch { owner: owner.to_string(),
                                                value: output.describe(),
                                                expected: self.describe() })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContractSchema {
    name: String,
    options: IndexMap<String, Parameter>,
    returns: Option<Returns>,
    injected: IndexMap<String, Value>,
}

impl ContractSchema {
    pub fn builder(name: impl Into<String>) -> ContractSchemaBuilder {
        ContractSchemaBuilder::new(Self { name: name.into(),
                                          options: IndexMap::new(),
                                          returns: None,
                                          injected: IndexMap::new() })
    }

    /// Hereda options, retorno y defaults del esquema actual.
    pub fn derive(&self, name: impl Into<String>) -> ContractSchemaBuilder {
        let mut copy = self.clone();
        copy.name = name.into();
        ContractSchemaBuilder::new(copy)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> impl Iterator<Item = &Parameter> {
        self.options.values()
    }

    pub fn option(&self, name: &str) -> Option<&Parameter> {
        self.options.get(name)
    }

    pub fn returns(&self) -> Option<&Returns> {
        self.returns.as_ref()
    }

    pub fn injected(&self) -> &IndexMap<String, Value> {
        &self.injected
    }

    /// Nuevo esquema con `defaults` inyectados. Se valida ya (tiempo de
    /// composición): un default que nombra un option declarado debe pasar
    /// su tipo.
    pub fn with_defaults(&self, defaults: Value) -> Result<ContractSchema, FlowError> {
        let mut schema = self.clone();
        schema.injected.extend(injected_map(&self.name, defaults)?);
        schema.validate_injected()?;
        Ok(schema)
    }

    /// Valida cada option declarado contra `lookup`: ausente ⇒
    /// `MissingOption`, presente e inválido ⇒ `OptionTypeMismatch`.
    pub fn validate<'v, F>(&self, lookup: F) -> Result<(), FlowError>
        where F: Fn(&str) -> Option<&'v Value>
    {
        for (key, parameter) in &self.options {
            let value = lookup(key).ok_or_else(|| FlowError::MissingOption { owner: self.name.clone(),
                                                                            key: key.clone(),
                                                                            expected: parameter.expected().to_string() })?;
            parameter.validate(value).map_err(|m| m.into_error(&self.name))?;
        }
        Ok(())
    }

    /// Verifica el valor producido por una salida normal del cuerpo.
    pub fn check_output(&self, output: &Output) -> Result<(), FlowError> {
        match &self.returns {
            Some(returns) => returns.check(&self.name, output),
            None => Ok(()),
        }
    }

    /// Un halt sólo se valida cuando la forma declarada es `Returns::Return`.
    pub fn check_halt(&self, ret: &ReturnValue) -> Result<(), FlowError> {
        match &self.returns {
            Some(Returns::Return(ty)) if !ty.check(ret.value()) => {
                Err(FlowError::ReturnTypeMismatch { owner: self.name.clone(),
                                                    value: ret.value().clone(),
                                                    expected: format!("Return<{}>", ty.name()) })
            }
            _ => Ok(()),
        }
    }

    fn validate_injected(&self) -> Result<(), FlowError> {
        for (key, value) in &self.injected {
            if let Some(parameter) = self.options.get(key) {
                parameter.validate(value).map_err(|m| m.into_error(&self.name))?;
            }
        }
        Ok(())
    }
}

fn injected_map(owner: &str, defaults: Value) -> Result<IndexMap<String, Value>, FlowError> {
    match defaults {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(FlowError::OptionTypeMismatch { owner: owner.to_string(),
                                                     key: CONTEXT_KEY.to_string(),
                                                     value: other,
                                                     expected: "object".to_string() }),
    }
}

/// Registra `parameter` en `options` aplicando las reglas de nombres.
pub(crate) fn declare_option(owner: &str,
                             options: &mut IndexMap<String, Parameter>,
                             parameter: Parameter)
                             -> Result<(), FlowError> {
    let name = parameter.name().to_string();
    if is_reserved(&name) {
        return Err(FlowError::DuplicateOrReservedName { owner: owner.to_string(),
                                                        name,
                                                        reason: "the name is reserved".to_string() });
    }
    if let Some(existing) = options.get(&name) {
        if !existing.is_compatible(&parameter) {
            return Err(FlowError::DuplicateOrReservedName { owner: owner.to_string(),
                                                            reason: format!("already declared as {}, cannot redeclare as {}",
                                                                            existing.expected(),
                                                                            parameter.expected()),
                                                            name });
        }
    }
    options.insert(name, parameter);
    Ok(())
}

/// Builder fluido; el primer error de declaración se reporta en `build`.
#[derive(Debug)]
pub struct ContractSchemaBuilder {
    schema: ContractSchema,
    error: Option<FlowError>,
}

impl ContractSchemaBuilder {
    fn new(schema: ContractSchema) -> Self {
        Self { schema, error: None }
    }

    pub fn option(self, name: impl Into<String>, ty: Type) -> Self {
        self.declare(Parameter::new(name, Some(ty)))
    }

    /// Option sin tipo: sólo se exige presencia.
    pub fn option_any(self, name: impl Into<String>) -> Self {
        self.declare(Parameter::new(name, None))
    }

    pub fn returns(mut self, returns: impl Into<Returns>) -> Self {
        self.schema.returns = Some(returns.into());
        self
    }

    /// Defaults inyectados antes de los valores del caller.
    pub fn inject(mut self, defaults: Value) -> Self {
        if self.error.is_none() {
            match injected_map(&self.schema.name, defaults) {
                Ok(map) => self.schema.injected.extend(map),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn build(self) -> Result<ContractSchema, FlowError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.schema.validate_injected()?;
        Ok(self.schema)
    }

    fn declare(mut self, parameter: Parameter) -> Self {
        if self.error.is_none() {
            if let Err(e) = declare_option(&self.schema.name, &mut self.schema.options, parameter) {
                self.error = Some(e);
            }
        }
        self
    }
}
