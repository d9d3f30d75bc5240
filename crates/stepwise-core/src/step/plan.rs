use super::{StepDefinition, With};
use crate::constants::is_reserved;
use crate::errors::FlowError;

/// Builder de una lista de steps hermanos (el nivel superior de una
/// transaction o el bloque de un step que anida).
///
/// Los nombres deben ser únicos entre hermanos y no reservados. El primer
/// error se conserva y se reporta al construir la transaction.
#[derive(Debug)]
pub struct StepsBuilder {
    owner: String,
    steps: Vec<StepDefinition>,
    error: Option<FlowError>,
}

impl StepsBuilder {
    pub(crate) fn new(owner: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        Self { owner: owner.into(),
               steps,
               error: None }
    }

    /// Agrega un step con el callable dado.
    pub fn step(mut self, name: impl Into<String>, with: With) -> Self {
        self.push(StepDefinition::new(name, with));
        self
    }

    /// Step resuelto a un método registrado con el mismo nombre.
    pub fn method_step(self, name: impl Into<String>) -> Self {
        self.step(name, With::Method)
    }

    /// Step cuyo cuerpo puede ejecutar los hijos declarados en `block`.
    pub fn nest<F>(mut self, name: impl Into<String>, with: With, block: F) -> Self
        where F: FnOnce(StepsBuilder) -> StepsBuilder
    {
        let name = name.into();
        let inner = block(StepsBuilder::new(format!("{}::{name}", self.owner), Vec::new()));
        match inner.finish() {
            Ok(children) => self.push(StepDefinition::new(name, with).with_children(children)),
            Err(e) => self.record(e),
        }
        self
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub(crate) fn finish(self) -> Result<Vec<StepDefinition>, FlowError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.steps),
        }
    }

    fn push(&mut self, step: StepDefinition) {
        if is_reserved(step.name()) {
            let e = FlowError::DuplicateOrReservedName { owner: self.owner.clone(),
                                                         name: step.name().to_string(),
                                                         reason: "the name is reserved".to_string() };
            self.record(e);
        } else if self.steps.iter().any(|s| s.name() == step.name()) {
            let e = FlowError::DuplicateOrReservedName { owner: self.owner.clone(),
                                                         name: step.name().to_string(),
                                                         reason: "a sibling step already uses this name".to_string() };
            self.record(e);
        } else {
            self.steps.push(step);
        }
    }

    fn record(&mut self, e: FlowError) {
        if self.error.is_none() {
            self.error = Some(e);
        }
    }
}
