//! Tipos de evento de una ejecución y estructura `RunEvent`.
//!
//! Cada ejecución de una transaction emite eventos a un `EventStore`
//! append-only. Sirven como bitácora observable del orden real de ejecución
//! (qué steps arrancaron, qué claves se fusionaron, dónde se detuvo).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::step::StepKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEventKind {
    /// Primer evento de un `run_id`: contexto ya construido y validado.
    RunStarted { transaction: String, step_count: usize },
    /// Un step comenzó; `depth` es 0 en el nivel superior.
    StepStarted { step: String, kind: StepKind, depth: usize },
    /// Un Option se fusionó en el contexto compartido.
    OptionMerged { step: String, keys: Vec<String> },
    /// Un Return detuvo la ejecución.
    Halted { step: String, value: Value },
    /// Cierre con el valor terminal ya validado.
    RunCompleted { value: Value },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u64, // asignado por el runner, ascendente por ejecución
    pub run_id: Uuid,
    pub kind: RunEventKind,
    pub ts: DateTime<Utc>,
}
