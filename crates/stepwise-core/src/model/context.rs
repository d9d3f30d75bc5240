use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::CONTEXT_KEY;
use crate::errors::FlowError;

/// Almacén clave/valor compartido por todos los steps de una ejecución.
///
/// Conserva el orden de inserción. Una clave ausente (`get` devuelve `None`)
/// es distinta de una clave presente con `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    entries: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.entries.insert(key.into(), value);
        self
    }

    /// Aplica cada par del patch; claves existentes se sobreescriben en su
    /// posición original, claves nuevas van al final.
    pub fn merge<K, I>(&mut self, patch: I) -> &mut Self
        where K: Into<String>,
              I: IntoIterator<Item = (K, Value)>
    {
        for (k, v) in patch {
            self.entries.insert(k.into(), v);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Vista JSON (objeto) del contenido actual.
    pub fn to_json(&self) -> Value {
        Value::Object(self.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl From<IndexMap<String, Value>> for Context {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl IntoIterator for Context {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Conversión de los valores iniciales que acepta un constructor: un
/// `Context` existente o un mapa crudo.
pub trait IntoContext {
    fn into_context(self, owner: &str) -> Result<Context, FlowError>;
}

impl IntoContext for Context {
    fn into_context(self, _owner: &str) -> Result<Context, FlowError> {
        Ok(self)
    }
}

impl IntoContext for &Context {
    fn into_context(self, _owner: &str) -> Result<Context, FlowError> {
        Ok(self.clone())
    }
}

impl IntoContext for IndexMap<String, Value> {
    fn into_context(self, _owner: &str) -> Result<Context, FlowError> {
        Ok(Context::from(self))
    }
}

impl IntoContext for Map<String, Value> {
    fn into_context(self, _owner: &str) -> Result<Context, FlowError> {
        Ok(self.into_iter().collect())
    }
}

impl IntoContext for Value {
    fn into_context(self, owner: &str) -> Result<Context, FlowError> {
        match self {
            Value::Object(map) => map.into_context(owner),
            // `null` equivale a "sin valores iniciales"
            Value::Null => Ok(Context::new()),
            other => Err(FlowError::OptionTypeMismatch { owner: owner.to_string(),
                                                         key: CONTEXT_KEY.to_string(),
                                                         value: other,
                                                         expected: "object".to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_is_distinct_from_null() {
        let mut ctx = Context::new();
        ctx.insert("empty", Value::Null);
        assert_eq!(ctx.get("empty"), Some(&Value::Null));
        assert_eq!(ctx.get("missing"), None);
        assert!(ctx.has("empty"));
        assert!(!ctx.has("missing"));
    }

    #[test]
    fn merge_overwrites_in_place_and_chains() {
        let mut ctx = Context::new();
        ctx.merge([("a", json!(1)), ("b", json!(2))])
           .merge([("a", json!(10)), ("c", json!(3))]);
        let keys: Vec<&str> = ctx.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(ctx.get("a"), Some(&json!(10)));
    }

    #[test]
    fn non_object_input_is_rejected() {
        let err = json!([1, 2]).into_context("Sample").unwrap_err();
        assert_eq!(err.kind(), "option_type_mismatch");
        assert!(json!(null).into_context("Sample").unwrap().is_empty());
    }
}
