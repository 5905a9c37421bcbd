// filters.rs
use crate::admission::{Admission, AdmissionState, AdmissionType, LegalState};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Filtro tipado para listar admisiones. Los campos en `None` no filtran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionFilter {
  pub admission_state: Option<AdmissionState>,
  pub legal_state: Option<LegalState>,
  pub archived: Option<bool>,
  pub convenio_type_id: Option<Uuid>,
  pub kitchen_id: Option<Uuid>,
  pub admission_type: Option<AdmissionType>,
}

impl AdmissionFilter {
  pub fn matches(&self, a: &Admission) -> bool {
    self.admission_state.map(|s| s == a.admission_state).unwrap_or(true)
    && self.legal_state.map(|s| Some(s) == a.legal_state).unwrap_or(true)
    && self.archived.map(|v| v == a.archived).unwrap_or(true)
    && self.convenio_type_id.map(|id| id == a.convenio_type_id).unwrap_or(true)
    && self.kitchen_id.map(|id| id == a.kitchen_id).unwrap_or(true)
    && self.admission_type.map(|t| t == a.admission_type).unwrap_or(true)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
  Eq,
  Ne,
  In,
  Contains,
  IsNull,
  Gt,
  Lt,
}

/// Mapa campo -> operadores admitidos para el filtro avanzado.
pub fn filter_fields() -> IndexMap<&'static str, Vec<FilterOperator>> {
  use FilterOperator::*;
  let mut m = IndexMap::new();
  m.insert("admission_state", vec![Eq, Ne, In]);
  m.insert("legal_state", vec![Eq, Ne, In, IsNull]);
  m.insert("admission_type", vec![Eq, Ne]);
  m.insert("archived", vec![Eq]);
  m.insert("convenio_type", vec![Eq, Ne, In]);
  m.insert("kitchen", vec![Eq, In]);
  m.insert("file_number", vec![Eq, Contains, IsNull]);
  m.insert("convenio_number", vec![Eq, Contains, IsNull]);
  m.insert("created_at", vec![Gt, Lt]);
  m
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_filter_matches_everything() {
    let a = Admission::new(Uuid::new_v4(), Uuid::new_v4(), AdmissionType::Renewal, "tec");
    assert!(AdmissionFilter::default().matches(&a));
    let f = AdmissionFilter { archived: Some(true), ..Default::default() };
    assert!(!f.matches(&a));
    let f = AdmissionFilter { legal_state: Some(LegalState::EnviadoLegales), ..Default::default() };
    assert!(!f.matches(&a));
  }

  #[test]
  fn filter_fields_keep_declaration_order() {
    let fields = filter_fields();
    assert_eq!(fields.keys().next(), Some(&"admission_state"));
    assert!(fields["legal_state"].contains(&FilterOperator::IsNull));
  }
}
