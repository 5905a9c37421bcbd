// convenio.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tipo de convenio. Determina el catálogo de documentos exigidos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvenioType {
  pub id: Uuid,
  /// Nombre estable (por ejemplo `personeria_juridica_eclesiastica`).
  pub code: String,
  pub name: String,
  /// Variante "personería jurídica eclesiástica": admite vencimiento
  /// "no corresponde" en los formularios.
  pub eclesiastica: bool,
}

impl ConvenioType {
  pub fn new(code: &str, name: &str, eclesiastica: bool) -> Result<Self, DomainError> {
    if code.trim().is_empty() {
      return Err(DomainError::ValidationError("El código del convenio no puede estar vacío".to_string()));
    }
    Ok(Self { id: Uuid::new_v4(), code: code.to_string(), name: name.to_string(), eclesiastica })
  }
}
