//! Engine: transactions, recorrido de steps y ejecuciones preparadas.
//!
//! Provee el descriptor `Transaction` (con su builder), el `Runner` interno
//! que recorre el árbol de steps y la `Execution` que expone overrides por
//! ejecución y produce el `Outcome`.

pub mod execution;
pub(crate) mod runner;
pub mod transaction;

pub use execution::{Execution, Outcome};
pub use transaction::{Transaction, TransactionBuilder};
