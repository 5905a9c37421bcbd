// formulary.rs
use crate::admission::AdmissionType;
use crate::choice::Choice;
use crate::convenio::ConvenioType;
use crate::document::FileHandle;
use crate::DomainError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tipos de formulario legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormularyKind {
  ConvenioProject,
  DispositionProject,
}

impl Choice for FormularyKind {
  const ALL: &'static [Self] = &[FormularyKind::ConvenioProject, FormularyKind::DispositionProject];

  fn code(&self) -> &'static str {
    match self {
      FormularyKind::ConvenioProject => "convenio_project",
      FormularyKind::DispositionProject => "disposition_project",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      FormularyKind::ConvenioProject => "Proyecto de convenio",
      FormularyKind::DispositionProject => "Proyecto de disposición",
    }
  }
}

/// Referencias a los artefactos generados (PDF y documento editable).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRefs {
  pub pdf: Option<FileHandle>,
  pub docx: Option<FileHandle>,
}

impl ArtifactRefs {
  pub fn new(pdf: FileHandle, docx: FileHandle) -> Self {
    Self { pdf: Some(pdf), docx: Some(docx) }
  }

  pub fn is_complete(&self) -> bool {
    self.pdf.is_some() && self.docx.is_some()
  }

  pub fn handles(&self) -> Vec<FileHandle> {
    self.pdf.iter().chain(self.docx.iter()).cloned().collect()
  }
}

/// Vencimiento del convenio: fecha concreta o "no corresponde".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
  Date(NaiveDate),
  NoCorresponde,
}

/// Datos cargados en un formulario legal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormularyPayload {
  pub organization_name: String,
  pub representative_name: String,
  pub representative_dni: String,
  pub start_date: NaiveDate,
  pub expiry: Expiry,
  pub beneficiaries: u32,
  #[serde(default)]
  pub observations: Option<String>,
}

impl FormularyPayload {
  /// Valida campos obligatorios y la coherencia del vencimiento "no
  /// corresponde" con el tipo de convenio.
  pub fn validate(&self, convenio: &ConvenioType, admission_type: AdmissionType) -> Result<(), DomainError> {
    let required = [("organization_name", &self.organization_name),
                    ("representative_name", &self.representative_name),
                    ("representative_dni", &self.representative_dni)];
    for (name, value) in required {
      if value.trim().is_empty() {
        return Err(DomainError::ValidationError(format!("Falta el campo obligatorio '{}'", name)));
      }
    }
    if !self.representative_dni.chars().all(|c| c.is_ascii_digit()) {
      return Err(DomainError::ValidationError("El DNI del representante debe ser numérico".to_string()));
    }
    match self.expiry {
      Expiry::Date(d) if d <= self.start_date => {
        Err(DomainError::ValidationError("El vencimiento debe ser posterior a la fecha de inicio".to_string()))
      }
      Expiry::NoCorresponde if !no_corresponde_allowed(convenio, admission_type) => {
        Err(DomainError::ValidationError(format!("Vencimiento 'no corresponde' no admitido para el convenio '{}'",
                                                 convenio.name)))
      }
      _ => Ok(()),
    }
  }
}

/// "No corresponde" sólo vale para el convenio eclesiástico en
/// incorporaciones y renovaciones.
pub fn no_corresponde_allowed(convenio: &ConvenioType, admission_type: AdmissionType) -> bool {
  convenio.eclesiastica && matches!(admission_type, AdmissionType::Incorporation | AdmissionType::Renewal)
}

/// Formulario legal adjunto a una admisión. A lo sumo uno por tipo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formulary {
  pub id: Uuid,
  pub kind: FormularyKind,
  pub payload: FormularyPayload,
  /// Sólo en disposiciones: replica el tipo de admisión.
  pub disposition_subtype: Option<AdmissionType>,
  pub if_number: Option<String>,
  pub artifacts: ArtifactRefs,
  pub created_by: String,
  pub created_at: DateTime<Utc>,
}

impl Formulary {
  pub fn new(kind: FormularyKind, payload: FormularyPayload, admission_type: AdmissionType, created_by: &str) -> Self {
    let disposition_subtype = match kind {
      FormularyKind::DispositionProject => Some(admission_type),
      FormularyKind::ConvenioProject => None,
    };
    Self { id: Uuid::new_v4(),
           kind,
           payload,
           disposition_subtype,
           if_number: None,
           artifacts: ArtifactRefs::default(),
           created_by: created_by.to_string(),
           created_at: Utc::now() }
  }

  pub fn has_if_number(&self) -> bool {
    self.if_number.as_deref().map(|n| !n.trim().is_empty()).unwrap_or(false)
  }
}
