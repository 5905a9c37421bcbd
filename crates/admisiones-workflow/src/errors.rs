use admisiones_domain::DomainError;
use historial::HistoryError;
use thiserror::Error;

// Errores del motor de admisiones.
//
// Las cinco primeras variantes son las que ve quien invoca una acción; las
// restantes envuelven errores de las capas inferiores.
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// Precondición de una operación violada. `reason` es un código estable
  /// legible por máquina (por ejemplo `report_not_validated`).
  #[error("Transición inválida en '{operation}': {reason}")]
  InvalidTransition { operation: String, reason: String },

  /// El actor no tiene el grupo requerido para la acción en el estado actual.
  #[error("La acción '{action}' no está permitida para {actor}")]
  AuthorizationDenied { action: String, actor: String },

  /// Payload mal formado o restricción de campo violada.
  #[error("Error de validación: {0}")]
  ValidationFailure(String),

  /// Fallo al generar un artefacto. Nunca deshace la transición.
  #[error("Error al generar artefacto: {0}")]
  ArtifactGenerationFailure(String),

  /// Otra transición sobre la misma admisión ganó la carrera; reintentable.
  #[error("Transición concurrente en conflicto: {0}")]
  ConflictingConcurrentTransition(String),

  #[error("No encontrado: {0}")]
  NotFound(String),

  #[error("Error de dominio: {0}")]
  Domain(DomainError),

  #[error("Error de historial: {0}")]
  History(#[from] HistoryError),

  #[error("Error de serializacion: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl From<DomainError> for WorkflowError {
  fn from(e: DomainError) -> Self {
    match e {
      DomainError::ValidationError(msg) => WorkflowError::ValidationFailure(msg),
      DomainError::InvalidState(reason) => WorkflowError::InvalidTransition { operation: String::new(), reason },
      other => WorkflowError::Domain(other),
    }
  }
}

impl WorkflowError {
  pub fn invalid(operation: &str, reason: impl Into<String>) -> Self {
    WorkflowError::InvalidTransition { operation: operation.to_string(), reason: reason.into() }
  }

  pub fn denied(action: impl Into<String>, actor: impl ToString) -> Self {
    WorkflowError::AuthorizationDenied { action: action.into(), actor: actor.to_string() }
  }

  /// Completa el nombre de la operación en transiciones inválidas que
  /// vienen del dominio sin él.
  pub fn in_operation(self, op: &str) -> Self {
    match self {
      WorkflowError::InvalidTransition { operation, reason } if operation.is_empty() => {
        WorkflowError::InvalidTransition { operation: op.to_string(), reason }
      }
      other => other,
    }
  }

  /// Familia de mensaje visible: una por tipo de error.
  pub fn message_family(&self) -> &'static str {
    match self {
      WorkflowError::InvalidTransition { .. } => "transicion_invalida",
      WorkflowError::AuthorizationDenied { .. } => "no_autorizado",
      WorkflowError::ValidationFailure(_) => "validacion",
      WorkflowError::ArtifactGenerationFailure(_) => "artefacto",
      WorkflowError::ConflictingConcurrentTransition(_) => "conflicto",
      WorkflowError::NotFound(_) => "no_encontrado",
      WorkflowError::Domain(_) | WorkflowError::History(_) | WorkflowError::Serialization(_) => "interno",
    }
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self, WorkflowError::ConflictingConcurrentTransition(_))
  }

  /// Código de motivo de una transición inválida.
  pub fn reason(&self) -> Option<&str> {
    match self {
      WorkflowError::InvalidTransition { reason, .. } => Some(reason),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn domain_errors_map_to_user_families() {
    let e: WorkflowError = DomainError::InvalidState("report_validated".into()).into();
    let e = e.in_operation("save_report");
    assert_eq!(e.message_family(), "transicion_invalida");
    assert_eq!(e.reason(), Some("report_validated"));
    assert!(e.to_string().contains("save_report"));

    let e: WorkflowError = DomainError::ValidationError("falta sello".into()).into();
    assert_eq!(e.message_family(), "validacion");
    assert!(e.to_string().contains("falta sello"));
  }

  #[test]
  fn only_conflicts_are_retryable() {
    assert!(WorkflowError::ConflictingConcurrentTransition("x".into()).is_retryable());
    assert!(!WorkflowError::invalid("op", "r").is_retryable());
  }
}
