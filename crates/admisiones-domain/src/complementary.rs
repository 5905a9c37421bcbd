// complementary.rs
use crate::choice::Choice;
use crate::technical_report::is_report_field;
use crate::DomainError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplementaryState {
  Draft,
  AwaitingValidation,
  Rectify,
  Approved,
}

impl Choice for ComplementaryState {
  const ALL: &'static [Self] = &[ComplementaryState::Draft,
                                 ComplementaryState::AwaitingValidation,
                                 ComplementaryState::Rectify,
                                 ComplementaryState::Approved];

  fn code(&self) -> &'static str {
    match self {
      ComplementaryState::Draft => "draft",
      ComplementaryState::AwaitingValidation => "awaiting_validation",
      ComplementaryState::Rectify => "rectify",
      ComplementaryState::Approved => "approved",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      ComplementaryState::Draft => "Borrador",
      ComplementaryState::AwaitingValidation => "Pendiente de validación",
      ComplementaryState::Rectify => "A rectificar",
      ComplementaryState::Approved => "Aprobado",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplementaryDecision {
  Approved,
  Rectify,
}

/// Sobrescrituras aprobadas. Sólo `ComplementaryReport::approve` las
/// construye, y son la única vía para modificar un informe validado.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedOverrides {
  report_id: Uuid,
  values: IndexMap<String, JsonValue>,
}

impl ApprovedOverrides {
  pub fn report_id(&self) -> Uuid {
    self.report_id
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
    self.values.iter()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

/// Delta sobre un informe técnico validado pendiente de revisión legal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplementaryReport {
  id: Uuid,
  report_id: Uuid,
  state: ComplementaryState,
  overrides: IndexMap<String, JsonValue>,
  observations: Option<String>,
  created_by: String,
  updated_at: DateTime<Utc>,
}

impl ComplementaryReport {
  pub fn new(report_id: Uuid, created_by: &str) -> Self {
    Self { id: Uuid::new_v4(),
           report_id,
           state: ComplementaryState::Draft,
           overrides: IndexMap::new(),
           observations: None,
           created_by: created_by.to_string(),
           updated_at: Utc::now() }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn report_id(&self) -> Uuid {
    self.report_id
  }

  pub fn state(&self) -> ComplementaryState {
    self.state
  }

  pub fn overrides(&self) -> &IndexMap<String, JsonValue> {
    &self.overrides
  }

  pub fn observations(&self) -> Option<&str> {
    self.observations.as_deref()
  }

  pub fn is_active(&self) -> bool {
    self.state != ComplementaryState::Approved
  }

  /// Reemplaza las sobrescrituras anteriores. Se permite en borrador o
  /// rectificación; el complementario vuelve a borrador.
  pub fn stage(&mut self, overrides: Vec<(String, JsonValue)>) -> Result<(), DomainError> {
    match self.state {
      ComplementaryState::Draft | ComplementaryState::Rectify => {}
      _ => return Err(DomainError::InvalidState("complementary_not_editable".to_string())),
    }
    if let Some((unknown, _)) = overrides.iter().find(|(f, _)| !is_report_field(f)) {
      return Err(DomainError::ValidationError(format!("Campo desconocido '{}'", unknown)));
    }
    self.overrides = overrides.into_iter().collect();
    self.state = ComplementaryState::Draft;
    self.updated_at = Utc::now();
    Ok(())
  }

  /// `draft -> awaiting_validation`.
  pub fn submit(&mut self) -> Result<(), DomainError> {
    if self.state != ComplementaryState::Draft {
      return Err(DomainError::InvalidState("complementary_not_draft".to_string()));
    }
    if self.overrides.is_empty() {
      return Err(DomainError::ValidationError("El informe complementario no tiene campos modificados".to_string()));
    }
    self.state = ComplementaryState::AwaitingValidation;
    self.updated_at = Utc::now();
    Ok(())
  }

  fn ensure_awaiting(&self) -> Result<(), DomainError> {
    if self.state != ComplementaryState::AwaitingValidation {
      return Err(DomainError::InvalidState("complementary_not_awaiting_validation".to_string()));
    }
    Ok(())
  }

  pub fn approve(&mut self) -> Result<ApprovedOverrides, DomainError> {
    self.ensure_awaiting()?;
    self.state = ComplementaryState::Approved;
    self.updated_at = Utc::now();
    Ok(ApprovedOverrides { report_id: self.report_id, values: self.overrides.clone() })
  }

  pub fn rectify(&mut self, observations: &str) -> Result<(), DomainError> {
    self.ensure_awaiting()?;
    let observations = observations.trim();
    if observations.is_empty() {
      return Err(DomainError::ValidationError("Debe indicar observaciones para rectificar".to_string()));
    }
    self.observations = Some(observations.to_string());
    self.state = ComplementaryState::Rectify;
    self.updated_at = Utc::now();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn stage_replaces_previous_overrides() -> Result<(), DomainError> {
    let mut c = ComplementaryReport::new(Uuid::new_v4(), "abogado");
    c.stage(vec![("nombre_espacio".to_string(), json!("A"))])?;
    c.stage(vec![("solicitudes_cena_lunes".to_string(), json!(5))])?;
    assert_eq!(c.overrides().len(), 1);
    assert!(c.overrides().contains_key("solicitudes_cena_lunes"));
    Ok(())
  }

  #[test]
  fn rectify_then_restage_and_approve() -> Result<(), DomainError> {
    let mut c = ComplementaryReport::new(Uuid::new_v4(), "abogado");
    assert!(c.submit().is_err());
    c.stage(vec![("nombre_espacio".to_string(), json!("A"))])?;
    c.submit()?;
    assert!(c.rectify("").is_err());
    c.rectify("falta fundamentar")?;
    assert_eq!(c.state(), ComplementaryState::Rectify);
    c.stage(vec![("nombre_espacio".to_string(), json!("B"))])?;
    c.submit()?;
    let approved = c.approve()?;
    assert_eq!(approved.len(), 1);
    assert!(!c.is_active());
    assert!(c.stage(vec![]).is_err());
    Ok(())
  }
}
