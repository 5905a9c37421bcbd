// Archivo: errors.rs
// Propósito: errores del historial y el alias Result<T> usado por las APIs
// del crate.
use thiserror::Error;
/// Errores comunes del historial de admisiones.
///
/// - `NotFound`: no existe historial para la admisión.
/// - `Conflict`: conflicto de versión o cursor.
/// - `Storage`: error al acceder al almacenamiento.
#[derive(Error, Debug, Clone)]
pub enum HistoryError {
  /// Historial no encontrado para la admisión indicada.
  #[error("No encontrado: {0}")]
  NotFound(String),
  /// Conflicto optimista (versión esperada distinta o cursor no monótono).
  #[error("Conflicto: {0}")]
  Conflict(String),
  /// Error genérico de almacenamiento.
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
}
/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, HistoryError>;
