//! Predicados de tipo mínimos.
//!
//! Un `Type` es un nombre legible más un predicado sobre `serde_json::Value`.
//! El motor sólo depende de "predicado(valor) → pasa/falla + descripción";
//! cualquier `Type` construido por el caller es una extensión válida.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Predicado con nombre. Barato de clonar.
#[derive(Clone)]
pub struct Type {
    name: String,
    check: Predicate,
}

impl Type {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
        where F: Fn(&Value) -> bool + Send + Sync + 'static
    {
        Self { name: name.into(),
               check: Arc::new(check) }
    }

    /// Descripción de la forma esperada (aparece en los errores).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.check)(value)
    }

    /// Acepta además `null`.
    pub fn optional(self) -> Self {
        let name = format!("{}?", self.name);
        Self::new(name, move |v| v.is_null() || self.check(v))
    }

    /// Unión: pasa si cualquiera de los dos pasa.
    pub fn or(self, other: Type) -> Self {
        let name = format!("{} | {}", self.name, other.name);
        Self::new(name, move |v| self.check(v) || other.check(v))
    }

    /// Refinamiento: el valor debe pasar `self` y además `predicate`.
    pub fn constrained<F>(self, name: &str, predicate: F) -> Self
        where F: Fn(&Value) -> bool + Send + Sync + 'static
    {
        let full = format!("{}({name})", self.name);
        Self::new(full, move |v| self.check(v) && predicate(v))
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Type").field(&self.name).finish()
    }
}

pub fn any() -> Type {
    Type::new("any", |_| true)
}

pub fn string() -> Type {
    Type::new("string", Value::is_string)
}

pub fn integer() -> Type {
    Type::new("integer", |v| v.is_i64() || v.is_u64())
}

pub fn number() -> Type {
    Type::new("number", Value::is_number)
}

pub fn boolean() -> Type {
    Type::new("boolean", Value::is_boolean)
}

pub fn array() -> Type {
    Type::new("array", Value::is_array)
}

pub fn object() -> Type {
    Type::new("object", Value::is_object)
}

pub fn null() -> Type {
    Type::new("null", Value::is_null)
}

/// Arreglo cuyos elementos pasan todos `item`.
pub fn array_of(item: Type) -> Type {
    let name = format!("array<{}>", item.name());
    Type::new(name, move |v| v.as_array().is_some_and(|items| items.iter().all(|i| item.check(i))))
}
