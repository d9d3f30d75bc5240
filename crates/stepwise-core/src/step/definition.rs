use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::contract::{Contract, Scope};
use crate::signal::Flow;

/// Cuerpo de un step que corre en el scope de la transaction (métodos,
/// funciones y overrides).
pub type StepFn = Arc<dyn Fn(&mut Scope<'_>) -> Flow + Send + Sync>;

/// Estrategia de invocación resuelta para un step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    Override,
    Method,
    Function,
    Contract,
}

/// Callable declarado de un step.
#[derive(Clone)]
pub enum With {
    /// Sin callable: se resuelve a un método registrado en la transaction
    /// con el mismo nombre.
    Method,
    Function(StepFn),
    Contract(Arc<dyn Contract>),
}

impl With {
    pub fn function<F>(f: F) -> Self
        where F: Fn(&mut Scope<'_>) -> Flow + Send + Sync + 'static
    {
        With::Function(Arc::new(f))
    }

    pub fn contract<C: Contract + 'static>(contract: C) -> Self {
        With::Contract(Arc::new(contract))
    }

    pub fn kind(&self) -> StepKind {
        match self {
            With::Method => StepKind::Method,
            With::Function(_) => StepKind::Function,
            With::Contract(_) => StepKind::Contract,
        }
    }
}

impl fmt::Debug for With {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            With::Method => f.write_str("Method"),
            With::Function(_) => f.write_str("Function(..)"),
            With::Contract(c) => f.debug_tuple("Contract").field(&c.schema().name()).finish(),
        }
    }
}

/// Nodo del plan: nombre, callable y steps hijos opcionales.
///
/// Inmutable una vez creado. Clonar produce nodos nuevos que comparten los
/// callables (también inmutables), así una transaction derivada nunca
/// altera la del padre.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    name: String,
    with: With,
    yielding: Option<Vec<StepDefinition>>,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, with: With) -> Self {
        Self { name: name.into(),
               with,
               yielding: None }
    }

    pub fn with_children(mut self, children: Vec<StepDefinition>) -> Self {
        self.yielding = Some(children);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with(&self) -> &With {
        &self.with
    }

    pub fn kind(&self) -> StepKind {
        self.with.kind()
    }

    /// Steps hijos; vacío si el step no anida.
    pub fn children(&self) -> &[StepDefinition] {
        self.yielding.as_deref().unwrap_or(&[])
    }

    pub fn is_yielding(&self) -> bool {
        self.yielding.is_some()
    }

    /// Recorre el subárbol en preorden (el propio step incluido).
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a StepDefinition)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}
