use crate::actions::Action;
use admisiones_domain::{Actor, Admission};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parámetros explícitos de toda operación: admisión, actor, versión
/// esperada (control optimista) y comando para deduplicar reenvíos.
///
/// Sin `expected_version`, la versión esperada es la que se lee al entrar a
/// la operación, antes de tomar el guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
  pub admission_id: Uuid,
  pub actor: Actor,
  pub expected_version: Option<i64>,
  pub command_id: Option<Uuid>,
  /// Acción del router que originó la operación; sus permisos se vuelven a
  /// verificar con el guard tomado.
  #[serde(default)]
  pub action: Option<Action>,
}

impl ActionContext {
  pub fn new(admission_id: Uuid, actor: Actor) -> Self {
    Self { admission_id, actor, expected_version: None, command_id: None, action: None }
  }

  pub fn via(mut self, action: Action) -> Self {
    self.action = Some(action);
    self
  }

  pub fn expecting(mut self, version: i64) -> Self {
    self.expected_version = Some(version);
    self
  }

  pub fn with_command(mut self, command_id: Uuid) -> Self {
    self.command_id = Some(command_id);
    self
  }
}

/// Resultado de una operación de escritura.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
  pub admission: Admission,
  pub version: i64,
  pub available_actions: Vec<Action>,
  /// Advertencias no fatales (artefactos no generados).
  pub warnings: Vec<String>,
  /// `true` si el comando ya había sido aplicado y no se hizo nada.
  pub replayed: bool,
}
