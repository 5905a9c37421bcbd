// document.rs
use crate::choice::Choice;
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Referencia opaca a un archivo en el almacén de documentos.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle(pub String);

impl FileHandle {
  pub fn new(uri: impl Into<String>) -> Self {
    Self(uri.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for FileHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Estado de un documento cargado en una admisión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
  Pending,
  ToValidate,
  ToValidateLawyer,
  ToRectify,
  Accepted,
}

impl Choice for DocumentStatus {
  const ALL: &'static [Self] = &[DocumentStatus::Pending,
                                 DocumentStatus::ToValidate,
                                 DocumentStatus::ToValidateLawyer,
                                 DocumentStatus::ToRectify,
                                 DocumentStatus::Accepted];

  fn code(&self) -> &'static str {
    match self {
      DocumentStatus::Pending => "pending",
      DocumentStatus::ToValidate => "to_validate",
      DocumentStatus::ToValidateLawyer => "to_validate_lawyer",
      DocumentStatus::ToRectify => "to_rectify",
      DocumentStatus::Accepted => "accepted",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      DocumentStatus::Pending => "Pendiente",
      DocumentStatus::ToValidate => "A validar",
      DocumentStatus::ToValidateLawyer => "A validar abogado",
      DocumentStatus::ToRectify => "Rectificar",
      DocumentStatus::Accepted => "Aceptado",
    }
  }
}

/// Entrada del catálogo de documentos por tipo de convenio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCatalogEntry {
  pub id: Uuid,
  pub name: String,
  pub mandatory: bool,
  pub convenio_types: Vec<Uuid>,
}

impl DocumentCatalogEntry {
  pub fn new(name: &str, mandatory: bool, convenio_types: Vec<Uuid>) -> Result<Self, DomainError> {
    if name.trim().is_empty() {
      return Err(DomainError::ValidationError("El nombre del documento no puede estar vacío".to_string()));
    }
    Ok(Self { id: Uuid::new_v4(), name: name.trim().to_string(), mandatory, convenio_types })
  }

  pub fn applies_to(&self, convenio_type_id: &Uuid) -> bool {
    self.convenio_types.contains(convenio_type_id)
  }
}

/// Documento cargado para una admisión. `catalog_id == None` identifica un
/// documento personalizado creado en el ámbito de la admisión.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionDocument {
  pub id: Uuid,
  pub catalog_id: Option<Uuid>,
  pub name: String,
  pub mandatory: bool,
  status: DocumentStatus,
  pub file: Option<FileHandle>,
  gde_number: Option<String>,
  observations: Option<String>,
  pub rectified: bool,
  pub uploaded_by: String,
  pub updated_at: DateTime<Utc>,
}

impl AdmissionDocument {
  /// Documento de catálogo recién cargado (`to_validate`).
  pub fn from_catalog(entry: &DocumentCatalogEntry, file: FileHandle, uploaded_by: &str) -> Self {
    Self { id: Uuid::new_v4(),
           catalog_id: Some(entry.id),
           name: entry.name.clone(),
           mandatory: entry.mandatory,
           status: DocumentStatus::ToValidate,
           file: Some(file),
           gde_number: None,
           observations: None,
           rectified: false,
           uploaded_by: uploaded_by.to_string(),
           updated_at: Utc::now() }
  }

  /// Documento personalizado; nunca es obligatorio.
  pub fn custom(name: &str, file: Option<FileHandle>, uploaded_by: &str) -> Result<Self, DomainError> {
    if name.trim().is_empty() {
      return Err(DomainError::ValidationError("El nombre del documento no puede estar vacío".to_string()));
    }
    let status = if file.is_some() { DocumentStatus::ToValidate } else { DocumentStatus::Pending };
    Ok(Self { id: Uuid::new_v4(),
              catalog_id: None,
              name: name.trim().to_string(),
              mandatory: false,
              status,
              file,
              gde_number: None,
              observations: None,
              rectified: false,
              uploaded_by: uploaded_by.to_string(),
              updated_at: Utc::now() })
  }

  pub fn status(&self) -> DocumentStatus {
    self.status
  }

  pub fn observations(&self) -> Option<&str> {
    self.observations.as_deref()
  }

  pub fn gde_number(&self) -> Option<&str> {
    self.gde_number.as_deref()
  }

  pub fn is_custom(&self) -> bool {
    self.catalog_id.is_none()
  }

  /// Cambia el estado. `to_rectify` exige observaciones no vacías; al salir
  /// de `to_rectify` el documento queda marcado como rectificado.
  pub fn set_status(&mut self, status: DocumentStatus, observations: Option<&str>) -> Result<(), DomainError> {
    let observations = observations.map(str::trim).filter(|o| !o.is_empty());
    if status == DocumentStatus::ToRectify && observations.is_none() {
      return Err(DomainError::ValidationError("Debe indicar observaciones para rectificar el documento".to_string()));
    }
    if self.status == DocumentStatus::ToRectify && status != DocumentStatus::ToRectify {
      self.rectified = true;
    }
    self.status = status;
    if let Some(o) = observations {
      self.observations = Some(o.to_string());
    }
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Reemplaza el archivo y vuelve el documento a `to_validate`. Devuelve el
  /// archivo anterior, si lo había.
  pub fn replace_file(&mut self, file: FileHandle, uploaded_by: &str) -> Option<FileHandle> {
    if self.status == DocumentStatus::ToRectify {
      self.rectified = true;
    }
    self.status = DocumentStatus::ToValidate;
    self.uploaded_by = uploaded_by.to_string();
    self.updated_at = Utc::now();
    self.file.replace(file)
  }

  /// El número GDE sólo se registra sobre documentos aceptados.
  pub fn set_gde_number(&mut self, number: &str) -> Result<(), DomainError> {
    if self.status != DocumentStatus::Accepted {
      return Err(DomainError::InvalidState("document_not_accepted".to_string()));
    }
    let number = number.trim();
    if number.is_empty() {
      return Err(DomainError::ValidationError("El número GDE no puede estar vacío".to_string()));
    }
    self.gde_number = Some(number.to_string());
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Un documento a rectificar no puede eliminarse.
  pub fn ensure_deletable(&self) -> Result<(), DomainError> {
    if self.status == DocumentStatus::ToRectify {
      return Err(DomainError::InvalidState("document_to_rectify".to_string()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry() -> DocumentCatalogEntry {
    DocumentCatalogEntry::new("Estatuto", true, vec![]).expect("catalog entry")
  }

  #[test]
  fn to_rectify_requires_observations() {
    let mut doc = AdmissionDocument::from_catalog(&entry(), FileHandle::new("mem://a"), "tec");
    assert!(doc.set_status(DocumentStatus::ToRectify, Some("  ")).is_err());
    assert_eq!(doc.status(), DocumentStatus::ToValidate);
    doc.set_status(DocumentStatus::ToRectify, Some("falta sello")).expect("rectify");
    assert_eq!(doc.observations(), Some("falta sello"));
    assert!(doc.ensure_deletable().is_err());
  }

  #[test]
  fn reupload_after_rectify_marks_rectified() {
    let mut doc = AdmissionDocument::from_catalog(&entry(), FileHandle::new("mem://a"), "tec");
    doc.set_status(DocumentStatus::ToRectify, Some("falta sello")).expect("rectify");
    let old = doc.replace_file(FileHandle::new("mem://b"), "tec");
    assert_eq!(old, Some(FileHandle::new("mem://a")));
    assert_eq!(doc.status(), DocumentStatus::ToValidate);
    assert!(doc.rectified);
  }

  #[test]
  fn gde_number_only_on_accepted() {
    let mut doc = AdmissionDocument::from_catalog(&entry(), FileHandle::new("mem://a"), "tec");
    assert_eq!(doc.set_gde_number("GDE-1"), Err(DomainError::InvalidState("document_not_accepted".to_string())));
    doc.set_status(DocumentStatus::Accepted, None).expect("accept");
    doc.set_gde_number("GDE-1").expect("gde");
    assert_eq!(doc.gde_number(), Some("GDE-1"));
  }
}
