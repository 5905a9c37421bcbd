use admisiones_domain::{Admission, KitchenRef};
use serde::{Deserialize, Serialize};

/// Hitos que se informan al colaborador de acompañamiento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateEvent {
  DocumentationApproved,
  SentToLegal,
  TechnicalReportValidated,
  AvailableForAccompaniment,
  LegalFinalized,
  Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateNotification {
  pub admission: Admission,
  pub kitchen: Option<KitchenRef>,
  pub event: StateEvent,
}

/// Receptor de notificaciones. Se invoca después del commit; no puede
/// afectar la transición.
pub trait StateNotifier: Send + Sync {
  fn notify(&self, notification: &StateNotification);
}
