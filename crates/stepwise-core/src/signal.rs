//! Señales producidas por el cuerpo de un contract.
//!
//! - `OptionValue`: patch a fusionar en el contexto antes del siguiente step.
//! - `ReturnValue`: valor terminal; detiene toda la ejecución en curso.
//!
//! Un cuerpo devuelve `Flow = Result<Output, Control>`. El canal `Err` lleva
//! tanto el cortocircuito `Control::Halt` como los fallos reales
//! (`Control::Fail`), de modo que `?` desenrolla ambos a través de cualquier
//! nivel de anidamiento. El runner los separa en la cima: un halt nunca se
//! reporta como error.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::OPTION_VALUE_KEY;
use crate::errors::FlowError;
use crate::types::Type;

/// Patch a fusionar en el contexto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionValue {
    value: IndexMap<String, Value>,
}

impl OptionValue {
    pub fn new<K, I>(patch: I) -> Self
        where K: Into<String>,
              I: IntoIterator<Item = (K, Value)>
    {
        Self { value: patch.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }

    /// Construye desde JSON; sólo se aceptan objetos.
    pub fn from_json(owner: &str, patch: Value) -> Result<Self, FlowError> {
        match patch {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(FlowError::OptionTypeMismatch { owner: owner.to_string(),
                                                         key: OPTION_VALUE_KEY.to_string(),
                                                         value: other,
                                                         expected: "object".to_string() }),
        }
    }

    /// Variante tipada: cada clave del esquema debe pasar su predicado.
    pub fn checked(owner: &str, patch: Value, schema: &OptionSchema) -> Result<Self, FlowError> {
        let option = Self::from_json(owner, patch)?;
        schema.check(owner, &option)?;
        Ok(option)
    }

    pub fn value(&self) -> &IndexMap<String, Value> {
        &self.value
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.value
    }
}

/// Valor terminal de una ejecución.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnValue {
    value: Value,
}

impl ReturnValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self { value: value.into() }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_inner(self) -> Value {
        self.value
    }
}

/// Esquema por clave para Options tipados.
#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    keys: IndexMap<String, Type>,
}

impl OptionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.keys.insert(name.into(), ty);
        self
    }

    /// Cada clave declarada debe existir en el patch y pasar su tipo. Una
    /// clave ausente se evalúa como `null`, así que sólo los tipos opcionales
    /// la aceptan.
    pub fn check(&self, owner: &str, option: &OptionValue) -> Result<(), FlowError> {
        for (key, ty) in &self.keys {
            let value = option.get(key).cloned().unwrap_or(Value::Null);
            if !ty.check(&value) {
                return Err(FlowError::OptionTypeMismatch { owner: owner.to_string(),
                                                           key: key.clone(),
                                                           value,
                                                           expected: ty.name().to_string() });
            }
        }
        Ok(())
    }

    /// Descripción compacta, p. ej. `Option{words: array<string>}`.
    pub fn describe(&self) -> String {
        let keys: Vec<String> = self.keys.iter().map(|(k, t)| format!("{k}: {}", t.name())).collect();
        format!("Option{{{}}}", keys.join(", "))
    }
}

/// Lo que produjo un cuerpo que terminó normalmente.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Option(OptionValue),
    Return(ReturnValue),
    Value(Value),
    /// Sin señal: el cuerpo sólo tuvo efectos sobre el contexto.
    Done,
}

impl Output {
    pub fn as_option(&self) -> Option<&OptionValue> {
        match self {
            Output::Option(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_return(&self) -> Option<&ReturnValue> {
        match self {
            Output::Return(r) => Some(r),
            _ => None,
        }
    }

    /// Representación JSON usada en diagnósticos.
    pub fn describe(&self) -> Value {
        match self {
            Output::Option(o) => serde_json::json!({ "Option": o.value() }),
            Output::Return(r) => serde_json::json!({ "Return": r.value() }),
            Output::Value(v) => v.clone(),
            Output::Done => Value::Null,
        }
    }
}

/// Canal de salida anticipada de un cuerpo.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Cortocircuito diseñado: terminar toda la ejecución con este valor.
    Halt(ReturnValue),
    /// Fallo real; aborta la ejecución.
    Fail(FlowError),
}

impl From<FlowError> for Control {
    fn from(err: FlowError) -> Self {
        Control::Fail(err)
    }
}

/// Resultado de todo cuerpo de step.
pub type Flow = Result<Output, Control>;

/// Emite un Option con `patch` (debe ser un objeto JSON).
pub fn option(owner: &str, patch: Value) -> Flow {
    Ok(Output::Option(OptionValue::from_json(owner, patch)?))
}

/// Emite un Return y desenrolla la ejecución.
pub fn halt(value: impl Into<Value>) -> Flow {
    Err(Control::Halt(ReturnValue::new(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;
    use serde_json::json;

    #[test]
    fn option_requires_an_object_patch() {
        let err = option("Splitter", json!([1])).unwrap_err();
        match err {
            Control::Fail(FlowError::OptionTypeMismatch { key, .. }) => assert_eq!(key, "value"),
            other => panic!("unexpected {other:?}"),
        }
        let ok = option("Splitter", json!({"words": ["a"]})).unwrap();
        assert_eq!(ok.as_option().and_then(|o| o.get("words")), Some(&json!(["a"])));
    }

    #[test]
    fn halt_is_not_a_failure() {
        assert_eq!(halt(42), Err(Control::Halt(ReturnValue::new(42))));
    }

    #[test]
    fn typed_option_checks_every_declared_key() {
        let schema = OptionSchema::new().key("foo", types::string());
        assert!(OptionValue::checked("Step", json!({"foo": "bar"}), &schema).is_ok());
        let err = OptionValue::checked("Step", json!({"bar": "x"}), &schema).unwrap_err();
        assert_eq!(err,
                   FlowError::OptionTypeMismatch { owner: "Step".into(),
                                                   key: "foo".into(),
                                                   value: Value::Null,
                                                   expected: "string".into() });
        assert_eq!(schema.describe(), "Option{foo: string}");
    }
}
