use uuid::Uuid;

use super::RunEvent;

/// Destino append-only de la bitácora. El runner asigna `seq` y `ts`; el
/// store sólo guarda y filtra por ejecución.
pub trait EventStore {
    fn append(&mut self, event: RunEvent);
    /// Eventos de `run_id` en orden de llegada.
    fn events(&self, run_id: Uuid) -> Vec<RunEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Vec<RunEvent>,
}

impl InMemoryEventStore {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&mut self, event: RunEvent) {
        self.events.push(event);
    }

    fn events(&self, run_id: Uuid) -> Vec<RunEvent> {
        self.events.iter().filter(|e| e.run_id == run_id).cloned().collect()
    }
}
