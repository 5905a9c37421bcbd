use super::{advance, regress_for_document, required_text, AdmissionStateMachine};
use crate::context::{ActionContext, TransitionOutcome};
use crate::errors::WorkflowError;
use crate::files::Upload;
use crate::tracking::labelled;
use admisiones_domain::{Actor, AdmissionDocument, AdmissionState, Choice, DocumentStatus, Role};
use historial::{ChangeValue, HistoryChange};
use uuid::Uuid;

/// Estados de documento que puede fijar cada grupo.
fn allowed_statuses(actor: &Actor) -> &'static [DocumentStatus] {
  use DocumentStatus::*;
  if actor.has_any(&[Role::Coordinator]) {
    &[Pending, ToValidate, ToValidateLawyer, ToRectify, Accepted]
  } else if actor.is_lawyer() {
    &[ToValidateLawyer, Accepted, ToRectify]
  } else if actor.is_technician() {
    &[Accepted, ToRectify]
  } else {
    &[]
  }
}

impl AdmissionStateMachine {
  /// Cambia el tipo de convenio. Descarta todos los documentos cargados; se
  /// registra como un único cambio.
  pub fn select_convenio(&self, ctx: &ActionContext, convenio_type_id: Uuid) -> Result<TransitionOutcome, WorkflowError> {
    if !ctx.actor.has_any(&[Role::Technician, Role::DuplaTechnician, Role::Coordinator]) {
      return Err(WorkflowError::denied("select_convenio", &ctx.actor));
    }
    let next = self.repo
                   .get_convenio(&convenio_type_id)?
                   .ok_or_else(|| WorkflowError::NotFound(format!("convenio {}", convenio_type_id)))?;
    self.transact(ctx, "select_convenio", |tx| {
      if tx.admission_state().is_past(AdmissionState::DocumentationInProgress) {
        return Err(tx.fail("documentation_past_in_progress"));
      }
      if tx.record.admission.convenio_type_id == next.id {
        return Ok(());
      }
      let dropped: Vec<AdmissionDocument> = std::mem::take(&mut tx.record.documents);
      for handle in dropped.iter().filter_map(|d| d.file.clone()) {
        tx.delete_after_commit(handle);
      }
      tx.push(HistoryChange::FieldChange { field: "convenio".to_string(),
                                           label: "Tipo de convenio".to_string(),
                                           before: ChangeValue::Text(tx.convenio.name.clone()),
                                           after: ChangeValue::Text(next.name.clone()) });
      tx.record.admission.convenio_type_id = next.id;
      tx.catalog = self.registry.catalog_for(&next.id)?;
      tx.convenio = next;
      Ok(())
    })
  }

  /// Carga o reemplaza el archivo de un documento de catálogo. El
  /// documento queda `to_validate`.
  pub fn upload_document(&self, ctx: &ActionContext, catalog_id: Uuid, upload: Upload)
                         -> Result<TransitionOutcome, WorkflowError> {
    if !ctx.actor.is_technician() && !ctx.actor.is_lawyer() {
      return Err(WorkflowError::denied("upload_document", &ctx.actor));
    }
    self.transact(ctx, "upload_document", |tx| {
      if tx.admission_state().is_terminal() {
        return Err(tx.fail("admission_finalized"));
      }
      let entry = tx.catalog
                    .iter()
                    .find(|e| e.id == catalog_id)
                    .cloned()
                    .ok_or_else(|| WorkflowError::ValidationFailure(format!("El documento {} no corresponde al convenio '{}'",
                                                                            catalog_id, tx.convenio.name)))?;
      let handle = self.files.put(&upload)?;
      tx.created_file(handle.clone());

      let actor_id = tx.actor.id().to_string();
      let (doc_id, previous) = match tx.record.documents.iter_mut().find(|d| d.catalog_id == Some(entry.id)) {
        Some(doc) => {
          let previous = doc.status();
          if let Some(old) = doc.replace_file(handle, &actor_id) {
            tx.deletes.enqueue(old);
          }
          (doc.id, Some(previous))
        }
        None => {
          let doc = AdmissionDocument::from_catalog(&entry, handle, &actor_id);
          let id = doc.id;
          tx.record.documents.push(doc);
          (id, None)
        }
      };
      tx.push(HistoryChange::DocumentStatusChange { document_id: doc_id,
                                                    document: entry.name.clone(),
                                                    from: previous.map(labelled),
                                                    to: labelled(DocumentStatus::ToValidate),
                                                    observations: None });
      if tx.admission_state() == AdmissionState::ConventionSelected {
        tx.move_admission(AdmissionState::DocumentationInProgress, None)?;
      }
      let reason = Some(format!("Documento '{}' reemplazado", entry.name));
      if !regress_for_document(tx, entry.mandatory, previous, DocumentStatus::ToValidate, reason)? {
        advance(tx)?;
      }
      Ok(())
    })
  }

  /// Fija el estado de un documento. Los estados permitidos dependen del
  /// grupo del actor; repetir el estado actual no hace nada.
  pub fn set_document_status(&self,
                             ctx: &ActionContext,
                             document_id: Uuid,
                             status: DocumentStatus,
                             observations: Option<&str>)
                             -> Result<TransitionOutcome, WorkflowError> {
    if !allowed_statuses(&ctx.actor).contains(&status) {
      return Err(WorkflowError::denied(format!("set_document_status:{}", status.code()), &ctx.actor));
    }
    self.transact(ctx, "set_document_status", |tx| {
      let doc = tx.record
                  .document(&document_id)
                  .cloned()
                  .ok_or_else(|| WorkflowError::NotFound(format!("documento {}", document_id)))?;
      if doc.status() == status {
        return Ok(());
      }
      if status == DocumentStatus::Accepted && doc.file.is_none() {
        return Err(tx.fail("document_without_file"));
      }
      let mut updated = doc.clone();
      updated.set_status(status, observations)?;
      let obs = updated.observations().map(str::to_string).filter(|_| status == DocumentStatus::ToRectify);
      if let Some(slot) = tx.record.document_mut(&document_id) {
        *slot = updated;
      }
      tx.push(HistoryChange::DocumentStatusChange { document_id,
                                                    document: doc.name.clone(),
                                                    from: Some(labelled(doc.status())),
                                                    to: labelled(status),
                                                    observations: obs.clone() });
      if !regress_for_document(tx, doc.mandatory, Some(doc.status()), status, obs)? {
        advance(tx)?;
      }
      Ok(())
    })
  }

  /// Alta de un documento personalizado en el ámbito de la admisión.
  pub fn create_custom(&self, ctx: &ActionContext, name: &str, upload: Option<Upload>)
                       -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "create_custom", |tx| {
      if tx.admission_state().is_terminal() {
        return Err(tx.fail("admission_finalized"));
      }
      let name = required_text(name, "el nombre del documento")?;
      if tx.record.documents.iter().any(|d| d.is_custom() && d.name.eq_ignore_ascii_case(&name)) {
        return Err(WorkflowError::ValidationFailure(format!("Ya existe un documento '{}'", name)));
      }
      let handle = match &upload {
        Some(u) => {
          let h = self.files.put(u)?;
          tx.created_file(h.clone());
          Some(h)
        }
        None => None,
      };
      let doc = AdmissionDocument::custom(&name, handle, tx.actor.id())?;
      tx.push(HistoryChange::DocumentStatusChange { document_id: doc.id,
                                                    document: doc.name.clone(),
                                                    from: None,
                                                    to: labelled(doc.status()),
                                                    observations: None });
      tx.record.documents.push(doc);
      Ok(())
    })
  }

  /// Número GDE de un documento aceptado.
  pub fn update_gde_number(&self, ctx: &ActionContext, document_id: Uuid, number: &str)
                           -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "update_gde_number", |tx| {
      let doc = tx.record
                  .document_mut(&document_id)
                  .ok_or_else(|| WorkflowError::NotFound(format!("documento {}", document_id)))?;
      let before = ChangeValue::text(doc.gde_number());
      doc.set_gde_number(number)?;
      let after = ChangeValue::text(doc.gde_number());
      let label = format!("Número GDE de '{}'", doc.name);
      if before != after {
        tx.push(HistoryChange::FieldChange { field: format!("documento.{}.numero_gde", document_id),
                                             label,
                                             before,
                                             after });
      }
      Ok(())
    })
  }

  /// Baja de un documento y de su archivo. Bloqueada si está a rectificar.
  pub fn delete_document(&self, ctx: &ActionContext, document_id: Uuid) -> Result<TransitionOutcome, WorkflowError> {
    if !ctx.actor.is_technician() && !ctx.actor.is_lawyer() {
      return Err(WorkflowError::denied("delete_document", &ctx.actor));
    }
    self.transact(ctx, "delete_document", |tx| {
      let pos = tx.record
                  .documents
                  .iter()
                  .position(|d| d.id == document_id)
                  .ok_or_else(|| WorkflowError::NotFound(format!("documento {}", document_id)))?;
      tx.record.documents[pos].ensure_deletable()?;
      let doc = tx.record.documents.remove(pos);
      if let Some(handle) = doc.file.clone() {
        tx.delete_after_commit(handle);
      }
      tx.push(HistoryChange::FieldChange { field: format!("documento.{}", doc.id),
                                           label: doc.name.clone(),
                                           before: ChangeValue::Choice(labelled(doc.status())),
                                           after: ChangeValue::Empty });
      let reason = format!("Documento '{}' eliminado", doc.name);
      let regressed = regress_for_document(tx, doc.mandatory, Some(doc.status()), DocumentStatus::Pending, Some(reason.clone()))?;
      if !regressed && doc.mandatory && tx.admission_state() == AdmissionState::DocumentationFinalized {
        tx.move_admission(AdmissionState::DocumentationInProgress, Some(reason))?;
      }
      Ok(())
    })
  }
}
