use crate::errors::WorkflowError;
use crate::files::PendingDeletes;
use crate::notifications::StateEvent;
use crate::tracking::labelled;
use admisiones_domain::{Actor, AdmissionRecord, AdmissionState, Choice, ConvenioType, DocumentCatalogEntry, FileHandle,
                        KitchenRef, LegalState};
use chrono::Utc;
use historial::{HistoryChange, StateAxis};

/// Unidad de trabajo de una transición: copia de trabajo del agregado más
/// todo lo que debe aplicarse al confirmar (historial, borrados de
/// archivos, notificaciones). Si la operación falla, nada de esto se
/// aplica.
pub struct Transition<'a> {
  pub operation: &'static str,
  pub actor: &'a Actor,
  pub record: AdmissionRecord,
  pub catalog: Vec<DocumentCatalogEntry>,
  pub convenio: ConvenioType,
  pub kitchen: Option<KitchenRef>,
  pub(crate) changes: Vec<HistoryChange>,
  pub(crate) warnings: Vec<String>,
  pub(crate) events: Vec<StateEvent>,
  pub(crate) deletes: PendingDeletes,
  pub(crate) created_files: Vec<FileHandle>,
}

impl<'a> Transition<'a> {
  pub(crate) fn new(operation: &'static str,
                    actor: &'a Actor,
                    record: AdmissionRecord,
                    catalog: Vec<DocumentCatalogEntry>,
                    convenio: ConvenioType,
                    kitchen: Option<KitchenRef>)
                    -> Self {
    Self { operation,
           actor,
           record,
           catalog,
           convenio,
           kitchen,
           changes: Vec::new(),
           warnings: Vec::new(),
           events: Vec::new(),
           deletes: PendingDeletes::default(),
           created_files: Vec::new() }
  }

  /// Error de precondición con el nombre de esta operación.
  pub fn fail(&self, reason: impl Into<String>) -> WorkflowError {
    WorkflowError::invalid(self.operation, reason)
  }

  pub fn admission_state(&self) -> AdmissionState {
    self.record.admission.admission_state
  }

  pub fn legal_state(&self) -> Option<LegalState> {
    self.record.admission.legal_state
  }

  /// Mueve `admission_state` por una arista permitida y lo registra.
  pub fn move_admission(&mut self, to: AdmissionState, reason: Option<String>) -> Result<(), WorkflowError> {
    let from = self.admission_state();
    if from == to {
      return Ok(());
    }
    if !from.can_transition_to(to) {
      return Err(self.fail(format!("edge_not_allowed:{}->{}", from.code(), to.code())));
    }
    let a = &mut self.record.admission;
    a.admission_state = to;
    a.state_changed_at = Utc::now();
    self.changes.push(HistoryChange::StateChange { axis: StateAxis::Admission,
                                                   from: Some(labelled(from)),
                                                   to: labelled(to),
                                                   reason });
    match to {
      AdmissionState::DocumentationApproved => self.events.push(StateEvent::DocumentationApproved),
      AdmissionState::SentToLegal if !self.events.contains(&StateEvent::SentToLegal) => {
        self.events.push(StateEvent::SentToLegal)
      }
      AdmissionState::Archived => self.events.push(StateEvent::Archived),
      _ => {}
    }
    Ok(())
  }

  /// Mueve `legal_state` por una arista permitida y lo registra.
  pub fn move_legal(&mut self, to: LegalState, reason: Option<String>) -> Result<(), WorkflowError> {
    let from = self.legal_state();
    if !LegalState::can_transition(from, to) {
      let from_code = from.map(|f| f.code()).unwrap_or("none");
      return Err(self.fail(format!("legal_edge_not_allowed:{}->{}", from_code, to.code())));
    }
    let a = &mut self.record.admission;
    a.legal_state = Some(to);
    a.state_changed_at = Utc::now();
    self.changes.push(HistoryChange::StateChange { axis: StateAxis::Legal,
                                                   from: from.map(labelled),
                                                   to: labelled(to),
                                                   reason });
    if to == LegalState::Finalized {
      self.events.push(StateEvent::LegalFinalized);
    }
    Ok(())
  }

  pub fn push(&mut self, change: HistoryChange) {
    self.changes.push(change);
  }

  pub fn event(&mut self, event: StateEvent) {
    self.events.push(event);
  }

  /// Advertencia no fatal: queda en el resultado y en el historial.
  pub fn warn(&mut self, artifact: &str, message: String) {
    log::warn!("admisión {}: {} ({})", self.record.id(), message, artifact);
    self.changes.push(HistoryChange::ArtifactWarning { artifact: artifact.to_string(), message: message.clone() });
    self.warnings.push(message);
  }

  /// El archivo se borra sólo si la transición confirma.
  pub fn delete_after_commit(&mut self, handle: FileHandle) {
    self.deletes.enqueue(handle);
  }

  /// Archivo subido durante la transición; se descarta si ésta falla.
  pub fn created_file(&mut self, handle: FileHandle) {
    self.created_files.push(handle);
  }

  pub fn has_changes(&self) -> bool {
    !self.changes.is_empty()
  }
}
