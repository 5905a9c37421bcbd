use crate::errors::WorkflowError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Guards de escritura por admisión. Una escritura sobre una admisión que ya
/// está siendo modificada se rechaza en el acto; admisiones distintas no se
/// bloquean entre sí.
///
/// Sólo hay entradas para las admisiones con una operación en curso.
#[derive(Default)]
pub struct AdmissionGuards {
  held: DashMap<Uuid, &'static str>,
}

/// Guard tomado; se libera al soltarse.
pub struct AdmissionGuard<'a> {
  guards: &'a AdmissionGuards,
  admission_id: Uuid,
}

impl AdmissionGuards {
  pub fn new() -> Self {
    Self::default()
  }

  /// Toma el guard de la admisión para `operation`. Si otra operación lo
  /// tiene, devuelve `ConflictingConcurrentTransition` sin esperar.
  pub fn acquire(&self, admission_id: Uuid, operation: &'static str) -> Result<AdmissionGuard<'_>, WorkflowError> {
    match self.held.entry(admission_id) {
      Entry::Occupied(holder) => {
        log::debug!("admisión {}: {} rechazada, {} en curso", admission_id, operation, holder.get());
        Err(WorkflowError::ConflictingConcurrentTransition(format!("la admisión {} está siendo modificada ({})",
                                                                   admission_id,
                                                                   holder.get())))
      }
      Entry::Vacant(slot) => {
        slot.insert(operation);
        Ok(AdmissionGuard { guards: self, admission_id })
      }
    }
  }

  pub fn is_held(&self, admission_id: &Uuid) -> bool {
    self.held.contains_key(admission_id)
  }

  /// Cantidad de admisiones con una operación en curso.
  pub fn len(&self) -> usize {
    self.held.len()
  }

  pub fn is_empty(&self) -> bool {
    self.held.is_empty()
  }
}

impl AdmissionGuard<'_> {
  pub fn admission_id(&self) -> Uuid {
    self.admission_id
  }
}

impl Drop for AdmissionGuard<'_> {
  fn drop(&mut self) {
    self.guards.held.remove(&self.admission_id);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn busy_admission_is_rejected_at_once() -> Result<(), WorkflowError> {
    let guards = AdmissionGuards::new();
    let id = Uuid::new_v4();
    let held = guards.acquire(id, "upload_document")?;
    let err = guards.acquire(id, "set_document_status").err();
    assert_eq!(err.as_ref().map(|e| e.is_retryable()), Some(true));
    assert!(err.map(|e| e.to_string().contains("upload_document")).unwrap_or(false));
    let other = guards.acquire(Uuid::new_v4(), "force_close")?;
    assert_eq!(guards.len(), 2);
    drop(other);
    drop(held);
    guards.acquire(id, "set_document_status")?;
    Ok(())
  }

  #[test]
  fn released_guards_leave_no_entries() -> Result<(), WorkflowError> {
    let guards = AdmissionGuards::new();
    for _ in 0..50 {
      let id = Uuid::new_v4();
      let g = guards.acquire(id, "create_custom")?;
      assert!(guards.is_held(&g.admission_id()));
    }
    assert!(guards.is_empty());
    Ok(())
  }
}
