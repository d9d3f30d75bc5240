//! Stepwise
//!
//! Este crate actúa como capa de aplicación sobre `stepwise-core`:
//! - Expone `config` con la configuración cargada del entorno.
//! - Expone `errors` con el error de aplicación.
//! - Expone `demo` con una transaction de ejemplo.
//!
//! Puede usarse desde `main.rs` o por otros crates/clientes.

pub mod config;
pub mod demo;
pub mod errors;
