//! Constantes del motor.
//!
//! Nombres reservados que ningún option ni step puede declarar: colisionan con
//! la superficie propia de un contract (`call`, el constructor y su
//! `context`).

/// Nombres reservados para options y steps.
pub const RESERVED_NAMES: [&str; 3] = ["call", "initialize", "context"];

/// Clave usada en diagnósticos cuando lo inválido es el contexto completo
/// (por ejemplo un input que no es un objeto JSON).
pub const CONTEXT_KEY: &str = "context";

/// Clave usada en diagnósticos cuando el patch de un Option no es un objeto.
pub const OPTION_VALUE_KEY: &str = "value";

/// `true` si `name` no puede usarse como option o step.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}
