use stepwise_core::FlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error(transparent)]
    Flow(#[from] FlowError),
}

impl AppError {
    /// Reporte para consola: el diagnóstico multi-línea si el error viene
    /// del motor.
    pub fn report(&self) -> String {
        match self {
            AppError::Flow(err) => err.diagnostic(),
            other => other.to_string(),
        }
    }
}
