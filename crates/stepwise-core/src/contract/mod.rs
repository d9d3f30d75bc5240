//! Contracts: unidades invocables con options validados y retorno tipado.
//!
//! Un contract es un valor que expone su `ContractSchema` y un cuerpo
//! `call`. Este módulo define:
//! - `Contract`: la interfaz que el motor invoca.
//! - `ContractSchema` / `Returns`: el descriptor declarativo.
//! - `Instance`: un contract construido y validado contra un contexto propio.
//! - `Scope`: la vista que recibe el cuerpo (accesores, señales, anidamiento).
//! - `WithDefaults`: derivación con defaults inyectados.

mod defaults;
mod instance;
pub mod parameter;
pub mod schema;
mod scope;

pub use defaults::WithDefaults;
pub use instance::Instance;
pub use parameter::{Mismatch, Parameter};
pub use schema::{ContractSchema, ContractSchemaBuilder, Returns};
pub use scope::Scope;
pub(crate) use scope::Nested;

use serde_json::Value;

use crate::errors::FlowError;
use crate::model::IntoContext;
use crate::signal::{Flow, Output};

pub trait Contract: Send + Sync {
    /// Esquema declarado (options, retorno, defaults).
    fn schema(&self) -> &ContractSchema;

    /// Cuerpo del contract. La implementación base no emite señal.
    fn call(&self, _scope: &mut Scope<'_>) -> Flow {
        Ok(Output::Done)
    }

    /// Construye una instancia validada, ejecuta el cuerpo y verifica el
    /// retorno declarado.
    fn invoke(&self, initial: impl IntoContext) -> Result<Output, FlowError>
        where Self: Sized
    {
        Instance::new(self, initial)?.call()
    }

    /// Deriva un contract con `defaults` inyectados (validados ya).
    fn with_defaults(self, defaults: Value) -> Result<WithDefaults<Self>, FlowError>
        where Self: Sized
    {
        WithDefaults::new(self, defaults)
    }
}
