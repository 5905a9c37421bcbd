// domain_repository.rs
use crate::convenio::ConvenioType;
use crate::document::DocumentCatalogEntry;
use crate::filters::AdmissionFilter;
use crate::kitchen::KitchenRef;
use crate::record::AdmissionRecord;
use crate::DomainError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Resultado de guardar un agregado con versión esperada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
  Saved { new_version: i64 },
  Conflict,
}

/// Persistencia de admisiones y de los catálogos de los que dependen.
pub trait AdmissionRepository: Send + Sync {
  /// Inserta un agregado nuevo con versión 0. Falla si el id ya existe.
  fn insert_admission(&self, record: AdmissionRecord) -> Result<(), DomainError>;

  fn get_admission(&self, id: &Uuid) -> Result<Option<AdmissionRecord>, DomainError>;

  /// Quita una admisión recién insertada cuya creación no pudo completarse.
  fn remove_admission(&self, id: &Uuid) -> Result<bool, DomainError>;

  /// Reemplaza el agregado si la versión almacenada coincide con
  /// `expected_version`; en ese caso la versión avanza en uno.
  fn save_admission(&self, record: AdmissionRecord, expected_version: i64) -> Result<SaveResult, DomainError>;

  fn list_admissions(&self, filter: &AdmissionFilter) -> Result<Vec<AdmissionRecord>, DomainError>;

  fn save_convenio(&self, convenio: ConvenioType) -> Result<Uuid, DomainError>;

  fn get_convenio(&self, id: &Uuid) -> Result<Option<ConvenioType>, DomainError>;

  fn list_convenios(&self) -> Result<Vec<ConvenioType>, DomainError>;

  fn save_catalog_entry(&self, entry: DocumentCatalogEntry) -> Result<Uuid, DomainError>;

  /// Entradas del catálogo aplicables a un tipo de convenio.
  fn catalog_for(&self, convenio_type_id: &Uuid) -> Result<Vec<DocumentCatalogEntry>, DomainError>;

  fn save_kitchen(&self, kitchen: KitchenRef) -> Result<Uuid, DomainError>;

  fn get_kitchen(&self, id: &Uuid) -> Result<Option<KitchenRef>, DomainError>;
}

/// Implementación en memoria para tests y desarrollo.
pub struct InMemoryAdmissionRepository {
  admissions: Arc<Mutex<HashMap<Uuid, AdmissionRecord>>>,
  convenios: Arc<Mutex<HashMap<Uuid, ConvenioType>>>,
  catalog: Arc<Mutex<Vec<DocumentCatalogEntry>>>,
  kitchens: Arc<Mutex<HashMap<Uuid, KitchenRef>>>,
}

impl InMemoryAdmissionRepository {
  pub fn new() -> Self {
    Self { admissions: Arc::new(Mutex::new(HashMap::new())),
           convenios: Arc::new(Mutex::new(HashMap::new())),
           catalog: Arc::new(Mutex::new(Vec::new())),
           kitchens: Arc::new(Mutex::new(HashMap::new())) }
  }

  fn lock_map<'a, T>(&'a self, m: &'a Mutex<T>, name: &str) -> Result<std::sync::MutexGuard<'a, T>, DomainError> {
    m.lock()
     .map_err(|e| DomainError::ExternalError(format!("Mutex '{}' poisoned: {}", name, e)))
  }
}

impl AdmissionRepository for InMemoryAdmissionRepository {
  fn insert_admission(&self, mut record: AdmissionRecord) -> Result<(), DomainError> {
    let mut map = self.lock_map(&self.admissions, "admissions")?;
    let id = record.id();
    if map.contains_key(&id) {
      return Err(DomainError::ValidationError(format!("La admisión {} ya existe", id)));
    }
    record.version = 0;
    map.insert(id, record);
    Ok(())
  }

  fn get_admission(&self, id: &Uuid) -> Result<Option<AdmissionRecord>, DomainError> {
    let map = self.lock_map(&self.admissions, "admissions")?;
    Ok(map.get(id).cloned())
  }

  fn remove_admission(&self, id: &Uuid) -> Result<bool, DomainError> {
    let mut map = self.lock_map(&self.admissions, "admissions")?;
    Ok(map.remove(id).is_some())
  }

  fn save_admission(&self, mut record: AdmissionRecord, expected_version: i64) -> Result<SaveResult, DomainError> {
    let mut map = self.lock_map(&self.admissions, "admissions")?;
    let id = record.id();
    let current = map.get(&id)
                     .map(|r| r.version)
                     .ok_or_else(|| DomainError::ValidationError(format!("Admisión {} no encontrada", id)))?;
    if current != expected_version {
      return Ok(SaveResult::Conflict);
    }
    record.version = current + 1;
    let new_version = record.version;
    map.insert(id, record);
    Ok(SaveResult::Saved { new_version })
  }

  fn list_admissions(&self, filter: &AdmissionFilter) -> Result<Vec<AdmissionRecord>, DomainError> {
    let map = self.lock_map(&self.admissions, "admissions")?;
    let mut out: Vec<AdmissionRecord> = map.values().filter(|r| filter.matches(&r.admission)).cloned().collect();
    out.sort_by_key(|r| r.admission.created_at);
    Ok(out)
  }

  fn save_convenio(&self, convenio: ConvenioType) -> Result<Uuid, DomainError> {
    let id = convenio.id;
    let mut map = self.lock_map(&self.convenios, "convenios")?;
    map.insert(id, convenio);
    Ok(id)
  }

  fn get_convenio(&self, id: &Uuid) -> Result<Option<ConvenioType>, DomainError> {
    let map = self.lock_map(&self.convenios, "convenios")?;
    Ok(map.get(id).cloned())
  }

  fn list_convenios(&self) -> Result<Vec<ConvenioType>, DomainError> {
    let map = self.lock_map(&self.convenios, "convenios")?;
    let mut out: Vec<ConvenioType> = map.values().cloned().collect();
    out.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(out)
  }

  fn save_catalog_entry(&self, entry: DocumentCatalogEntry) -> Result<Uuid, DomainError> {
    let id = entry.id;
    let mut catalog = self.lock_map(&self.catalog, "catalog")?;
    catalog.retain(|e| e.id != id);
    catalog.push(entry);
    Ok(id)
  }

  fn catalog_for(&self, convenio_type_id: &Uuid) -> Result<Vec<DocumentCatalogEntry>, DomainError> {
    let catalog = self.lock_map(&self.catalog, "catalog")?;
    Ok(catalog.iter().filter(|e| e.applies_to(convenio_type_id)).cloned().collect())
  }

  fn save_kitchen(&self, kitchen: KitchenRef) -> Result<Uuid, DomainError> {
    let id = kitchen.id;
    let mut map = self.lock_map(&self.kitchens, "kitchens")?;
    map.insert(id, kitchen);
    Ok(id)
  }

  fn get_kitchen(&self, id: &Uuid) -> Result<Option<KitchenRef>, DomainError> {
    let map = self.lock_map(&self.kitchens, "kitchens")?;
    Ok(map.get(id).cloned())
  }
}

impl Default for InMemoryAdmissionRepository {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::admission::{Admission, AdmissionType};

  #[test]
  fn stale_version_is_a_conflict() -> Result<(), DomainError> {
    let repo = InMemoryAdmissionRepository::new();
    let record = AdmissionRecord::new(Admission::new(Uuid::new_v4(), Uuid::new_v4(), AdmissionType::Incorporation, "tec"));
    let id = record.id();
    repo.insert_admission(record)?;
    let loaded = repo.get_admission(&id)?.ok_or(DomainError::ValidationError("missing".into()))?;
    assert_eq!(repo.save_admission(loaded.clone(), 0)?, SaveResult::Saved { new_version: 1 });
    assert_eq!(repo.save_admission(loaded, 0)?, SaveResult::Conflict);
    Ok(())
  }

  #[test]
  fn removed_admission_is_gone() -> Result<(), DomainError> {
    let repo = InMemoryAdmissionRepository::new();
    let record = AdmissionRecord::new(Admission::new(Uuid::new_v4(), Uuid::new_v4(), AdmissionType::Renewal, "tec"));
    let id = record.id();
    repo.insert_admission(record)?;
    assert!(repo.remove_admission(&id)?);
    assert!(repo.get_admission(&id)?.is_none());
    assert!(!repo.remove_admission(&id)?);
    Ok(())
  }

  #[test]
  fn catalog_is_scoped_by_convenio() -> Result<(), DomainError> {
    let repo = InMemoryAdmissionRepository::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    repo.save_catalog_entry(DocumentCatalogEntry::new("Estatuto", true, vec![a])?)?;
    repo.save_catalog_entry(DocumentCatalogEntry::new("Acta", true, vec![a, b])?)?;
    assert_eq!(repo.catalog_for(&a)?.len(), 2);
    assert_eq!(repo.catalog_for(&b)?.len(), 1);
    Ok(())
  }
}
