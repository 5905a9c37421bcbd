// Archivo: repository.rs
// Propósito: contrato de persistencia del historial. Las implementaciones
// (en memoria, base de datos) deben garantizar que un lote de registros se
// persiste completo o no se persiste.
use crate::domain::{HistoryEntry, HistoryMeta, PersistResult};
use crate::errors::Result;
use uuid::Uuid;

/// Contrato mínimo del repositorio de historial.
///
/// El historial es de sólo-anexado: no existen operaciones de borrado ni de
/// modificación de registros ya persistidos.
pub trait HistoryRepository: Send + Sync {
    /// Crea el historial de la admisión si no existe y devuelve sus
    /// metadatos. Es idempotente.
    fn open(&self, admission_id: &Uuid) -> Result<HistoryMeta>;

    /// Obtiene los metadatos del historial. `NotFound` si no fue abierto.
    fn get_meta(&self, admission_id: &Uuid) -> Result<HistoryMeta>;

    /// Persiste un lote de registros de forma atómica. `expected_version`
    /// permite detectar escrituras concurrentes (`PersistResult::Conflict`).
    /// Los cursores del lote deben ser estrictamente crecientes y mayores al
    /// cursor actual.
    fn persist_entries(&self, admission_id: &Uuid, entries: &[HistoryEntry], expected_version: i64) -> Result<PersistResult>;

    /// Lee los registros con `cursor > from_cursor`, ordenados.
    fn read_entries(&self, admission_id: &Uuid, from_cursor: i64) -> Result<Vec<HistoryEntry>>;

    /// Indica si algún registro de la admisión lleva el `command_id` dado.
    fn contains_command(&self, admission_id: &Uuid, command_id: &Uuid) -> Result<bool>;

    /// Cantidad de registros. -1 si el historial no existe.
    fn count_entries(&self, admission_id: &Uuid) -> Result<i64>;
}
