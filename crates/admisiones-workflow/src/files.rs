use crate::errors::WorkflowError;
use admisiones_domain::{DomainError, FileHandle};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Archivo subido por un actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
  pub name: String,
  pub content: Vec<u8>,
}

impl Upload {
  pub fn new(name: &str, content: impl Into<Vec<u8>>) -> Self {
    Self { name: name.to_string(), content: content.into() }
  }
}

/// Almacén de archivos de documentos y artefactos. Los handles son URIs
/// opacas.
pub trait FileStore: Send + Sync {
  fn put(&self, upload: &Upload) -> Result<FileHandle, WorkflowError>;
  fn delete(&self, handle: &FileHandle) -> Result<(), WorkflowError>;
  fn exists(&self, handle: &FileHandle) -> Result<bool, WorkflowError>;
}

/// Borrados de archivos diferidos hasta que el registro dueño confirma.
/// Si la transición falla, la cola se descarta y los archivos quedan.
#[derive(Debug, Default)]
pub struct PendingDeletes {
  queue: Vec<FileHandle>,
}

impl PendingDeletes {
  pub fn enqueue(&mut self, handle: FileHandle) {
    self.queue.push(handle);
  }

  pub fn len(&self) -> usize {
    self.queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }

  /// Ejecuta los borrados. Devuelve los handles que no pudieron borrarse.
  pub fn commit(self, store: &dyn FileStore) -> Vec<FileHandle> {
    let mut failed = Vec::new();
    for handle in self.queue {
      if let Err(e) = store.delete(&handle) {
        log::warn!("no se pudo borrar el archivo {}: {}", handle, e);
        failed.push(handle);
      }
    }
    failed
  }

  /// Descarta la cola sin tocar el almacén.
  pub fn rollback(self) -> usize {
    self.queue.len()
  }
}

struct StoredFile {
  content: Vec<u8>,
  refs: usize,
}

/// Almacén en memoria direccionado por contenido (SHA-256). Dos subidas
/// idénticas comparten handle; el archivo se borra con su última referencia.
#[derive(Default)]
pub struct InMemoryFileStore {
  files: Mutex<HashMap<String, StoredFile>>,
}

impl InMemoryFileStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredFile>>, WorkflowError> {
    self.files
        .lock()
        .map_err(|e| WorkflowError::Domain(DomainError::ExternalError(format!("Mutex 'files' poisoned: {}", e))))
  }

  pub fn read(&self, handle: &FileHandle) -> Result<Option<Vec<u8>>, WorkflowError> {
    Ok(self.lock()?.get(handle.as_str()).map(|f| f.content.clone()))
  }

  pub fn len(&self) -> Result<usize, WorkflowError> {
    Ok(self.lock()?.len())
  }

  pub fn is_empty(&self) -> Result<bool, WorkflowError> {
    Ok(self.lock()?.is_empty())
  }
}

pub fn content_hash(content: &[u8]) -> String {
  format!("{:x}", Sha256::digest(content))
}

impl FileStore for InMemoryFileStore {
  fn put(&self, upload: &Upload) -> Result<FileHandle, WorkflowError> {
    let name = upload.name.trim();
    if name.is_empty() || name.contains('/') {
      return Err(WorkflowError::ValidationFailure(format!("Nombre de archivo inválido: '{}'", upload.name)));
    }
    let hash = content_hash(&upload.content);
    let uri = format!("mem://sha256/{}/{}/{}", &hash[..2], hash, name);
    let mut files = self.lock()?;
    files.entry(uri.clone())
         .and_modify(|f| f.refs += 1)
         .or_insert_with(|| StoredFile { content: upload.content.clone(), refs: 1 });
    Ok(FileHandle::new(uri))
  }

  fn delete(&self, handle: &FileHandle) -> Result<(), WorkflowError> {
    let mut files = self.lock()?;
    let gone = match files.get_mut(handle.as_str()) {
      None => return Err(WorkflowError::NotFound(format!("archivo {}", handle))),
      Some(f) => {
        f.refs -= 1;
        f.refs == 0
      }
    };
    if gone {
      files.remove(handle.as_str());
    }
    Ok(())
  }

  fn exists(&self, handle: &FileHandle) -> Result<bool, WorkflowError> {
    Ok(self.lock()?.contains_key(handle.as_str()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_uploads_share_handle_until_last_delete() -> Result<(), WorkflowError> {
    let store = InMemoryFileStore::new();
    let a = store.put(&Upload::new("estatuto.pdf", "contenido"))?;
    let b = store.put(&Upload::new("estatuto.pdf", "contenido"))?;
    assert_eq!(a, b);
    store.delete(&a)?;
    assert!(store.exists(&b)?);
    store.delete(&b)?;
    assert!(!store.exists(&b)?);
    Ok(())
  }

  #[test]
  fn pending_deletes_only_apply_on_commit() -> Result<(), WorkflowError> {
    let store = InMemoryFileStore::new();
    let h = store.put(&Upload::new("acta.pdf", "x"))?;
    let mut pending = PendingDeletes::default();
    pending.enqueue(h.clone());
    assert_eq!(pending.rollback(), 1);
    assert!(store.exists(&h)?);

    let mut pending = PendingDeletes::default();
    pending.enqueue(h.clone());
    assert!(pending.commit(&store).is_empty());
    assert!(!store.exists(&h)?);
    Ok(())
  }
}
