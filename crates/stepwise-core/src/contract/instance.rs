use serde_json::Value;

use super::{Contract, Scope};
use crate::errors::FlowError;
use crate::model::{Context, IntoContext};
use crate::signal::{Control, Output};

/// Contract construido y validado, dueño de su propio `Context`.
///
/// Sólo puede obtenerse a través de `Instance::new`, que falla antes de
/// devolver nada si algún option está ausente o no pasa su tipo.
pub struct Instance<'c, C: ?Sized> {
    contract: &'c C,
    context: Context,
}

impl<'c, C: Contract + ?Sized> Instance<'c, C> {
    /// Defaults inyectados primero, luego los valores del caller (ganan los
    /// del caller); después se validan los options declarados.
    pub fn new(contract: &'c C, initial: impl IntoContext) -> Result<Self, FlowError> {
        let schema = contract.schema();
        let supplied = initial.into_context(schema.name())?;
        let mut context = Context::from(schema.injected().clone());
        context.merge(supplied);
        schema.validate(|key| context.get(key))?;
        Ok(Self { contract, context })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn into_context(self) -> Context {
        self.context
    }

    /// Accesor de valor de un option (o de cualquier clave del contexto).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Accesor de presencia: existe y no es `null` ni `false`.
    pub fn present(&self, key: &str) -> bool {
        !matches!(self.get(key), None | Some(Value::Null) | Some(Value::Bool(false)))
    }

    /// Ejecuta el cuerpo y valida el valor producido contra el retorno
    /// declarado. Un Return emitido por el cuerpo se entrega como
    /// `Output::Return`.
    pub fn call(&mut self) -> Result<Output, FlowError> {
        let contract = self.contract;
        let schema = contract.schema();
        let mut scope = Scope::new(schema.name(), &mut self.context).with_schema(schema);
        let output = match contract.call(&mut scope) {
            Ok(output) => output,
            Err(Control::Halt(ret)) => {
                schema.check_halt(&ret)?;
                log::debug!("{} halted with {}", schema.name(), ret.value());
                return Ok(Output::Return(ret));
            }
            Err(Control::Fail(err)) => return Err(err),
        };
        schema.check_output(&output)?;
        Ok(output)
    }
}
