use serde_json::Value;

use super::{Contract, ContractSchema, Scope};
use crate::errors::FlowError;
use crate::signal::Flow;

/// Contract derivado con defaults inyectados en su esquema.
///
/// Se valida al construirse: un default inválido falla aquí, no en la
/// llamada.
#[derive(Debug, Clone)]
pub struct WithDefaults<C> {
    inner: C,
    schema: ContractSchema,
}

impl<C: Contract> WithDefaults<C> {
    pub fn new(inner: C, defaults: Value) -> Result<Self, FlowError> {
        let schema = inner.schema().with_defaults(defaults)?;
        Ok(Self { inner, schema })
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Contract> Contract for WithDefaults<C> {
    fn schema(&self) -> &ContractSchema {
        &self.schema
    }

    fn call(&self, scope: &mut Scope<'_>) -> Flow {
        self.inner.call(scope)
    }
}
