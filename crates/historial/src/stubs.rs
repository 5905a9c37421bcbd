// Archivo: stubs.rs
// Propósito: implementación en memoria del historial para pruebas y wiring
// rápido. No es durable.
use crate::domain::{HistoryEntry, HistoryMeta, PersistResult};
use crate::errors::{HistoryError, Result};
use crate::repository::HistoryRepository;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Estado interno protegido por un único mutex: metadatos y registros se
/// actualizan juntos para que un lote sea atómico.
#[derive(Default)]
struct Inner {
    metas: HashMap<Uuid, HistoryMeta>,
    entries: HashMap<Uuid, Vec<HistoryEntry>>,
}

/// Repositorio de historial en memoria.
#[derive(Default)]
pub struct InMemoryHistoryRepository {
    inner: Mutex<Inner>,
}

impl InMemoryHistoryRepository {
    /// Crea una nueva instancia vacía.
    pub fn new() -> Self {
        Self::default()
    }

    /// Helper para mapear `Mutex::lock()` en `HistoryError::Storage`.
    fn lock(&self) -> std::result::Result<MutexGuard<'_, Inner>, HistoryError> {
        self.inner.lock().map_err(|e| HistoryError::Storage(format!("mutex poisoned: {:?}", e)))
    }
}

impl HistoryRepository for InMemoryHistoryRepository {
    fn open(&self, admission_id: &Uuid) -> Result<HistoryMeta> {
        let mut inner = self.lock()?;
        let meta = inner.metas
                        .entry(*admission_id)
                        .or_insert_with(|| HistoryMeta { admission_id: *admission_id,
                                                         current_cursor: 0,
                                                         current_version: 0,
                                                         created_at: Utc::now() })
                        .clone();
        Ok(meta)
    }

    fn get_meta(&self, admission_id: &Uuid) -> Result<HistoryMeta> {
        let inner = self.lock()?;
        inner.metas
             .get(admission_id)
             .cloned()
             .ok_or_else(|| HistoryError::NotFound(format!("historial {}", admission_id)))
    }

    /// Valida versión y monotonicidad de cursores antes de tocar el estado,
    /// de modo que un lote inválido no deja registros parciales.
    fn persist_entries(&self, admission_id: &Uuid, entries: &[HistoryEntry], expected_version: i64) -> Result<PersistResult> {
        let mut inner = self.lock()?;
        let meta = inner.metas
                        .get(admission_id)
                        .cloned()
                        .ok_or_else(|| HistoryError::NotFound(format!("historial {}", admission_id)))?;
        if meta.current_version != expected_version {
            return Ok(PersistResult::Conflict);
        }
        let mut last = meta.current_cursor;
        for e in entries {
            if &e.admission_id != admission_id {
                return Err(HistoryError::Conflict(format!("registro {} pertenece a otra admisión", e.id)));
            }
            if e.cursor <= last {
                return Err(HistoryError::Conflict(format!("cursor {} no es mayor que {}", e.cursor, last)));
            }
            last = e.cursor;
        }
        if entries.is_empty() {
            return Ok(PersistResult::Ok { new_version: meta.current_version });
        }
        inner.entries.entry(*admission_id).or_default().extend(entries.iter().cloned());
        let stored = inner.metas
                          .get_mut(admission_id)
                          .ok_or_else(|| HistoryError::NotFound(format!("historial {}", admission_id)))?;
        stored.current_cursor = last;
        stored.current_version = stored.current_version.saturating_add(1);
        Ok(PersistResult::Ok { new_version: stored.current_version })
    }

    fn read_entries(&self, admission_id: &Uuid, from_cursor: i64) -> Result<Vec<HistoryEntry>> {
        let inner = self.lock()?;
        Ok(inner.entries
                .get(admission_id)
                .map(|list| list.iter().filter(|e| e.cursor > from_cursor).cloned().collect())
                .unwrap_or_default())
    }

    fn contains_command(&self, admission_id: &Uuid, command_id: &Uuid) -> Result<bool> {
        let inner = self.lock()?;
        Ok(inner.entries
                .get(admission_id)
                .map(|list| list.iter().any(|e| e.command_id.as_ref() == Some(command_id)))
                .unwrap_or(false))
    }

    fn count_entries(&self, admission_id: &Uuid) -> Result<i64> {
        let inner = self.lock()?;
        if !inner.metas.contains_key(admission_id) {
            return Ok(-1);
        }
        Ok(inner.entries.get(admission_id).map(|l| l.len() as i64).unwrap_or(0))
    }
}
