//! Modelos neutrales: el `Context` compartido y su conversión desde input.

pub mod context;

pub use context::{Context, IntoContext};
