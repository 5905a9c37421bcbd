use crate::errors::WorkflowError;
use admisiones_domain::{AdmissionDocument, AdmissionRecord, AdmissionRepository, DocumentCatalogEntry};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct CachedCatalog {
  loaded_at: Instant,
  entries: Vec<DocumentCatalogEntry>,
}

/// Fila del listado de documentos de una admisión: entrada de catálogo con
/// su documento cargado (si lo hay) o documento personalizado.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSlot {
  pub catalog: Option<DocumentCatalogEntry>,
  pub document: Option<AdmissionDocument>,
}

/// Catálogos de documentos por tipo de convenio, cacheados con TTL corto.
pub struct DocumentRegistry {
  repo: Arc<dyn AdmissionRepository>,
  ttl: Duration,
  cache: DashMap<Uuid, CachedCatalog>,
}

impl DocumentRegistry {
  pub fn new(repo: Arc<dyn AdmissionRepository>, ttl: Duration) -> Self {
    Self { repo, ttl, cache: DashMap::new() }
  }

  /// Catálogo del convenio; se recarga si la copia en caché venció.
  pub fn catalog_for(&self, convenio_type_id: &Uuid) -> Result<Vec<DocumentCatalogEntry>, WorkflowError> {
    if let Some(cached) = self.cache.get(convenio_type_id) {
      if cached.loaded_at.elapsed() < self.ttl {
        return Ok(cached.entries.clone());
      }
    }
    let entries = self.repo.catalog_for(convenio_type_id)?;
    self.cache.insert(*convenio_type_id, CachedCatalog { loaded_at: Instant::now(), entries: entries.clone() });
    Ok(entries)
  }

  /// Alta de una entrada de catálogo; invalida la caché de sus convenios.
  pub fn add_entry(&self, entry: DocumentCatalogEntry) -> Result<Uuid, WorkflowError> {
    let convenios = entry.convenio_types.clone();
    let id = self.repo.save_catalog_entry(entry)?;
    for c in convenios {
      self.invalidate(&c);
    }
    Ok(id)
  }

  pub fn invalidate(&self, convenio_type_id: &Uuid) {
    self.cache.remove(convenio_type_id);
  }

  /// Documentos de la admisión: primero el catálogo de su convenio, después
  /// los personalizados.
  pub fn list_for(&self, record: &AdmissionRecord) -> Result<Vec<DocumentSlot>, WorkflowError> {
    let catalog = self.catalog_for(&record.admission.convenio_type_id)?;
    let mut out: Vec<DocumentSlot> = catalog.into_iter()
                                            .map(|e| {
                                              let document = record.document_for_catalog(&e.id).cloned();
                                              DocumentSlot { catalog: Some(e), document }
                                            })
                                            .collect();
    out.extend(record.documents
                     .iter()
                     .filter(|d| d.is_custom())
                     .map(|d| DocumentSlot { catalog: None, document: Some(d.clone()) }));
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use admisiones_domain::{DomainStubs, InMemoryAdmissionRepository};

  #[test]
  fn cache_serves_until_invalidated() -> Result<(), WorkflowError> {
    let sample = DomainStubs::sample()?;
    let repo: Arc<InMemoryAdmissionRepository> = sample.repo.clone();
    let registry = DocumentRegistry::new(repo.clone(), Duration::from_secs(60));
    assert_eq!(registry.catalog_for(&sample.base_id)?.len(), 1);
    repo.save_catalog_entry(DocumentCatalogEntry::new("Plano", true, vec![sample.base_id])?)?;
    assert_eq!(registry.catalog_for(&sample.base_id)?.len(), 1);
    registry.invalidate(&sample.base_id);
    assert_eq!(registry.catalog_for(&sample.base_id)?.len(), 2);
    Ok(())
  }

  #[test]
  fn zero_ttl_always_reloads() -> Result<(), WorkflowError> {
    let sample = DomainStubs::sample()?;
    let registry = DocumentRegistry::new(sample.repo.clone(), Duration::ZERO);
    sample.repo.save_catalog_entry(DocumentCatalogEntry::new("Plano", true, vec![sample.base_id])?)?;
    assert_eq!(registry.catalog_for(&sample.base_id)?.len(), 2);
    Ok(())
  }
}
