//! Definiciones relacionadas a Steps.
//!
//! Un step es un nodo del plan de una transaction: nombre, callable (`With`)
//! y, opcionalmente, steps hijos que su cuerpo puede ejecutar. Este módulo
//! define:
//! - `StepDefinition` / `With` / `StepKind`: el nodo y su estrategia.
//! - `StepsBuilder`: construcción fluida de listas de hermanos y bloques.
//! - `contract!`: macro para declarar contracts.

pub mod definition;
pub mod macros;
pub mod plan;

pub use definition::{StepDefinition, StepFn, StepKind, With};
pub use plan::StepsBuilder;
