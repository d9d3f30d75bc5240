//! stepwise-core: contracts tipados y transactions secuenciales en proceso.
//!
//! Un contract declara options (parámetros con nombre y tipo) y un retorno;
//! una transaction ordena steps (métodos, funciones o contracts) que leen un
//! contexto compartido, le fusionan Options y pueden terminar la ejecución
//! con un Return.
pub mod constants;
pub mod contract;
pub mod engine;
pub mod errors;
pub mod event;
pub mod model;
pub mod signal;
pub mod step;
pub mod types;

pub use contract::{Contract, ContractSchema, Instance, Parameter, Returns, Scope, WithDefaults};
pub use engine::{Execution, Outcome, Transaction, TransactionBuilder};
pub use errors::FlowError;
pub use event::{EventStore, InMemoryEventStore, RunEvent, RunEventKind};
pub use model::{Context, IntoContext};
pub use signal::{halt, option, Control, Flow, OptionSchema, OptionValue, Output, ReturnValue};
pub use step::{StepDefinition, StepKind, StepsBuilder, With};
pub use types::Type;
