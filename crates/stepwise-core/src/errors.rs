//! Errores del motor.
//!
//! Cada modo de fallo es una variante distinta para que el caller pueda
//! distinguirlos sin inspeccionar mensajes. Todas llevan el `owner` (nombre
//! del contract o transaction que declaró lo que falló) y, cuando aplica, la
//! clave, el valor ofensivo y la descripción de la forma esperada.
//!
//! `Control::Halt` (ver `signal`) no es un error y nunca se convierte en uno.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone, Serialize, Deserialize)]
pub enum FlowError {
    #[error("{owner}: missing option `{key}` (expected {expected})")]
    MissingOption { owner: String, key: String, expected: String },

    #[error("{owner}: option `{key}` has value {value} which is not {expected}")]
    OptionTypeMismatch {
        owner: String,
        key: String,
        value: Value,
        expected: String,
    },

    #[error("{owner}: returned {value} which is not {expected}")]
    ReturnTypeMismatch { owner: String, value: Value, expected: String },

    #[error("{owner}: all steps ran but no return value was produced")]
    MissingReturn { owner: String },

    #[error("{owner}: cannot declare `{name}`: {reason}")]
    DuplicateOrReservedName { owner: String, name: String, reason: String },

    #[error("{owner}: step `{step}` has no callable and no method is registered under that name")]
    UndefinedMethod { owner: String, step: String },

    #[error("{owner}: step `{step}` failed: {message}")]
    StepFailed { owner: String, step: String, message: String },
}

impl FlowError {
    /// Etiqueta estable de la variante (útil en logs y asserts).
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::MissingOption { .. } => "missing_option",
            FlowError::OptionTypeMismatch { .. } => "option_type_mismatch",
            FlowError::ReturnTypeMismatch { .. } => "return_type_mismatch",
            FlowError::MissingReturn { .. } => "missing_return",
            FlowError::DuplicateOrReservedName { .. } => "duplicate_or_reserved_name",
            FlowError::UndefinedMethod { .. } => "undefined_method",
            FlowError::StepFailed { .. } => "step_failed",
        }
    }

    /// Contract o transaction que originó el error.
    pub fn owner(&self) -> &str {
        match self {
            FlowError::MissingOption { owner, .. }
            | FlowError::OptionTypeMismatch { owner, .. }
            | FlowError::ReturnTypeMismatch { owner, .. }
            | FlowError::MissingReturn { owner }
            | FlowError::DuplicateOrReservedName { owner, .. }
            | FlowError::UndefinedMethod { owner, .. }
            | FlowError::StepFailed { owner, .. } => owner,
        }
    }

    /// Reporte multilínea legible: bloques `Source`, `Description` y `Error`.
    ///
    /// `Display` da una sola línea; este formato está pensado para mostrarse
    /// tal cual al desarrollador que compuso el pipeline.
    pub fn diagnostic(&self) -> String {
        let (description, detail) = match self {
            FlowError::MissingOption { key, expected, .. } => {
                (format!("option `{key}` is declared as {expected}"), format!("No value was provided for `{key}`."))
            }
            FlowError::OptionTypeMismatch { key, value, expected, .. } => {
                (format!("option `{key}` is declared as {expected}"),
                 format!("The value {value} failed the following test: {expected}"))
            }
            FlowError::ReturnTypeMismatch { value, expected, .. } => {
                (format!("the return value is declared as {expected}"),
                 format!("The value {value} failed the following test: {expected}"))
            }
            FlowError::MissingReturn { .. } => ("a return value is required".to_string(),
                                                "No step returned a value and no return option was found in the context.".to_string()),
            FlowError::DuplicateOrReservedName { name, reason, .. } => {
                (format!("declaration of `{name}`"), reason.clone())
            }
            FlowError::UndefinedMethod { step, .. } => {
                (format!("step `{step}` resolves to a method"), format!("No method named `{step}` is registered."))
            }
            FlowError::StepFailed { step, message, .. } => (format!("step `{step}`"), message.clone()),
        };
        ["".to_string(),
         "".to_string(),
         "Source:".to_string(),
         format!("  {}", self.owner()),
         "".to_string(),
         "Description:".to_string(),
         format!("  {description}"),
         "".to_string(),
         "Error:".to_string(),
         format!("  {detail}"),
         "".to_string()].join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_is_single_line() {
        let err = FlowError::OptionTypeMismatch { owner: "Splitter".into(),
                                                  key: "sentence".into(),
                                                  value: json!(3),
                                                  expected: "string".into() };
        assert_eq!(err.to_string(), "Splitter: option `sentence` has value 3 which is not string");
        assert_eq!(err.kind(), "option_type_mismatch");
    }

    #[test]
    fn diagnostic_names_owner_key_and_shape() {
        let err = FlowError::MissingOption { owner: "Splitter".into(),
                                             key: "sentence".into(),
                                             expected: "string".into() };
        let report = err.diagnostic();
        assert!(report.contains("Source:\n  Splitter"));
        assert!(report.contains("option `sentence` is declared as string"));
        assert!(report.contains("Error:"));
    }
}
