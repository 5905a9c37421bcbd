// domain_stubs.rs
use crate::convenio::ConvenioType;
use crate::document::DocumentCatalogEntry;
use crate::domain_repository::{AdmissionRepository, InMemoryAdmissionRepository};
use crate::kitchen::KitchenRef;
use crate::DomainError;
use std::sync::Arc;
use uuid::Uuid;

pub struct DomainStubs;

/// Datos sembrados por `DomainStubs::sample`.
pub struct SampleData {
  pub repo: Arc<InMemoryAdmissionRepository>,
  pub kitchen_id: Uuid,
  /// `personeria_juridica_eclesiastica`: tres documentos obligatorios y uno
  /// opcional.
  pub eclesiastica_id: Uuid,
  pub personeria_id: Uuid,
  /// Convenio sin documentos obligatorios.
  pub base_id: Uuid,
}

impl DomainStubs {
  /// Repositorio en memoria con un comedor, tres tipos de convenio y su
  /// catálogo de documentos.
  pub fn sample() -> Result<SampleData, DomainError> {
    let repo = Arc::new(InMemoryAdmissionRepository::new());

    let kitchen = KitchenRef::new("Comedor Los Pibes", "Parroquia San José", "Buenos Aires", Some("Marta Gómez"));
    let kitchen_id = repo.save_kitchen(kitchen)?;

    let eclesiastica_id = repo.save_convenio(ConvenioType::new("personeria_juridica_eclesiastica",
                                                               "Personería jurídica eclesiástica",
                                                               true)?)?;
    let personeria_id = repo.save_convenio(ConvenioType::new("personeria_juridica", "Personería jurídica", false)?)?;
    let base_id = repo.save_convenio(ConvenioType::new("base_juridica", "Base jurídica", false)?)?;

    for name in ["Estatuto", "Acta de designación de autoridades", "DNI del representante"] {
      repo.save_catalog_entry(DocumentCatalogEntry::new(name, true, vec![eclesiastica_id, personeria_id])?)?;
    }
    repo.save_catalog_entry(DocumentCatalogEntry::new("Constancia de CUIT", true, vec![personeria_id])?)?;
    repo.save_catalog_entry(DocumentCatalogEntry::new("Nota de aval", false, vec![eclesiastica_id, base_id])?)?;

    Ok(SampleData { repo, kitchen_id, eclesiastica_id, personeria_id, base_id })
  }
}
