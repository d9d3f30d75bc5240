use serde_json::Value;

use crate::errors::FlowError;
use crate::types::Type;

/// Firma de un option declarado: nombre más predicado opcional.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    ty: Option<Type>,
}

/// Resultado inválido de `Parameter::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub parameter: String,
    pub value: Value,
    pub expected: String,
}

impl Mismatch {
    pub fn into_error(self, owner: &str) -> FlowError {
        FlowError::OptionTypeMismatch { owner: owner.to_string(),
                                        key: self.parameter,
                                        value: self.value,
                                        expected: self.expected }
    }
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Option<Type>) -> Self {
        Self { name: name.into(), ty }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }

    /// Descripción de la forma esperada; `any` si no hay tipo.
    pub fn expected(&self) -> &str {
        self.ty.as_ref().map(Type::name).unwrap_or("any")
    }

    /// Sin tipo declarado siempre es válido.
    pub fn validate(&self, value: &Value) -> Result<(), Mismatch> {
        match &self.ty {
            Some(ty) if !ty.check(value) => Err(Mismatch { parameter: self.name.clone(),
                                                           value: value.clone(),
                                                           expected: ty.name().to_string() }),
            _ => Ok(()),
        }
    }

    /// Dos declaraciones del mismo nombre son compatibles si describen la
    /// misma forma.
    pub(crate) fn is_compatible(&self, other: &Parameter) -> bool {
        self.expected() == other.expected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;
    use serde_json::json;

    #[test]
    fn untyped_parameter_accepts_anything() {
        let p = Parameter::new("test", None);
        assert_eq!(p.name(), "test");
        assert!(p.validate(&json!(null)).is_ok());
        assert_eq!(p.expected(), "any");
    }

    #[test]
    fn typed_parameter_reports_structured_mismatch() {
        let p = Parameter::new("test", Some(types::string()));
        assert!(p.validate(&json!("Hello")).is_ok());
        let m = p.validate(&json!(true)).unwrap_err();
        assert_eq!(m,
                   Mismatch { parameter: "test".into(),
                              value: json!(true),
                              expected: "string".into() });
    }
}
