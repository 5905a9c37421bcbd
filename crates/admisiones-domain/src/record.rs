// record.rs
use crate::admission::Admission;
use crate::complementary::ComplementaryReport;
use crate::document::{AdmissionDocument, DocumentCatalogEntry, DocumentStatus};
use crate::formulary::{Formulary, FormularyKind};
use crate::technical_report::TechnicalReport;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Agregado persistido de una admisión: la admisión, sus documentos,
/// formularios e informes. `version` crece con cada guardado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
  pub admission: Admission,
  pub documents: Vec<AdmissionDocument>,
  pub convenio_formulary: Option<Formulary>,
  pub disposition_formulary: Option<Formulary>,
  pub technical_report: Option<TechnicalReport>,
  pub complementary: Option<ComplementaryReport>,
  pub version: i64,
}

impl AdmissionRecord {
  pub fn new(admission: Admission) -> Self {
    Self { admission,
           documents: Vec::new(),
           convenio_formulary: None,
           disposition_formulary: None,
           technical_report: None,
           complementary: None,
           version: 0 }
  }

  pub fn id(&self) -> Uuid {
    self.admission.id
  }

  pub fn formulary(&self, kind: FormularyKind) -> Option<&Formulary> {
    match kind {
      FormularyKind::ConvenioProject => self.convenio_formulary.as_ref(),
      FormularyKind::DispositionProject => self.disposition_formulary.as_ref(),
    }
  }

  pub fn formulary_mut(&mut self, kind: FormularyKind) -> &mut Option<Formulary> {
    match kind {
      FormularyKind::ConvenioProject => &mut self.convenio_formulary,
      FormularyKind::DispositionProject => &mut self.disposition_formulary,
    }
  }

  pub fn document(&self, id: &Uuid) -> Option<&AdmissionDocument> {
    self.documents.iter().find(|d| &d.id == id)
  }

  pub fn document_mut(&mut self, id: &Uuid) -> Option<&mut AdmissionDocument> {
    self.documents.iter_mut().find(|d| &d.id == id)
  }

  pub fn document_for_catalog(&self, catalog_id: &Uuid) -> Option<&AdmissionDocument> {
    self.documents.iter().find(|d| d.catalog_id.as_ref() == Some(catalog_id))
  }

  fn mandatory_entries<'a>(&'a self, catalog: &'a [DocumentCatalogEntry])
                           -> impl Iterator<Item = &'a DocumentCatalogEntry> + 'a {
    let convenio = self.admission.convenio_type_id;
    catalog.iter().filter(move |e| e.mandatory && e.applies_to(&convenio))
  }

  /// Cada documento obligatorio del convenio está cargado y aceptado.
  pub fn mandatory_documents_complete(&self, catalog: &[DocumentCatalogEntry]) -> bool {
    self.mandatory_entries(catalog)
        .all(|e| self.document_for_catalog(&e.id).map(|d| d.status() == DocumentStatus::Accepted).unwrap_or(false))
  }

  /// Cada documento obligatorio tiene archivo, sin importar su estado.
  pub fn mandatory_documents_have_files(&self, catalog: &[DocumentCatalogEntry]) -> bool {
    self.mandatory_entries(catalog)
        .all(|e| self.document_for_catalog(&e.id).map(|d| d.file.is_some()).unwrap_or(false))
  }

  /// Ambos formularios cargados y con número de IF.
  pub fn formularies_numbered(&self) -> bool {
    [FormularyKind::ConvenioProject, FormularyKind::DispositionProject]
      .iter()
      .all(|k| self.formulary(*k).map(|f| f.has_if_number()).unwrap_or(false))
  }

  pub fn report_validated(&self) -> bool {
    self.technical_report.as_ref().map(|r| r.state().is_validated_or_later()).unwrap_or(false)
  }

  pub fn active_complementary(&self) -> Option<&ComplementaryReport> {
    self.complementary.as_ref().filter(|c| c.is_active())
  }
}
