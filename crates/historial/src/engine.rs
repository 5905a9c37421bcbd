// Archivo: engine.rs
// Propósito: `HistoryLog`, helper ergonómico sobre `HistoryRepository` que
// asigna cursores, toma la versión actual y persiste lotes de cambios.
use crate::domain::{HistoryChange, HistoryEntry, HistoryKind, PersistResult};
use crate::errors::Result;
use crate::repository::HistoryRepository;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Historial de sólo-anexado de las admisiones.
///
/// Los registros de una misma admisión quedan totalmente ordenados por
/// `cursor`. La serialización entre escritores la provee quien llama (el
/// guard por admisión del motor de workflow); el control optimista de
/// versión detecta cualquier escritura que lo eluda.
pub struct HistoryLog<R>
    where R: HistoryRepository + ?Sized
{
    repo: Arc<R>,
}

impl<R> HistoryLog<R> where R: HistoryRepository + ?Sized
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Acceso al repositorio subyacente.
    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Anexa un lote de cambios del mismo actor como una unidad.
    ///
    /// Los cursores se calculan a partir de `HistoryMeta.current_cursor`; el
    /// historial se abre si todavía no existe. Un lote vacío no incrementa la
    /// versión.
    pub fn record(&self,
                  admission_id: Uuid,
                  actor: &str,
                  command_id: Option<Uuid>,
                  changes: Vec<HistoryChange>)
                  -> Result<PersistResult> {
        let meta = self.repo.open(&admission_id)?;
        let now = Utc::now();
        let entries: Vec<HistoryEntry> = changes.into_iter()
                                                .enumerate()
                                                .map(|(i, change)| HistoryEntry { id: Uuid::new_v4(),
                                                                                  admission_id,
                                                                                  cursor: meta.current_cursor + 1 + i as i64,
                                                                                  change,
                                                                                  actor: actor.to_string(),
                                                                                  command_id,
                                                                                  created_at: now })
                                                .collect();
        let res = self.repo.persist_entries(&admission_id, &entries, meta.current_version)?;
        if let PersistResult::Ok { new_version } = &res {
            log::debug!("historial {}: {} registros (versión {})", admission_id, entries.len(), new_version);
        }
        Ok(res)
    }

    /// Todos los registros de la admisión en orden de commit.
    pub fn entries(&self, admission_id: &Uuid) -> Result<Vec<HistoryEntry>> {
        self.repo.read_entries(admission_id, 0)
    }

    /// Registros de un tipo concreto, en orden.
    pub fn entries_of_kind(&self, admission_id: &Uuid, kind: HistoryKind) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries(admission_id)?.into_iter().filter(|e| e.kind() == kind).collect())
    }

    /// Indica si un comando ya fue aplicado a la admisión.
    pub fn has_command(&self, admission_id: &Uuid, command_id: &Uuid) -> Result<bool> {
        self.repo.contains_command(admission_id, command_id)
    }

    /// Cantidad de registros; 0 si el historial todavía no existe.
    pub fn count(&self, admission_id: &Uuid) -> Result<i64> {
        Ok(self.repo.count_entries(admission_id)?.max(0))
    }
}
