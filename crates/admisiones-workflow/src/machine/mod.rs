//! Máquina de estados de las admisiones.
//!
//! Cada operación pública corre como una unidad: toma el guard de la
//! admisión, carga el agregado, verifica idempotencia, versión y archivo,
//! aplica la operación sobre una copia de trabajo (`Transition`) y confirma
//! agregado + historial juntos. Los borrados de archivos y las
//! notificaciones se ejecutan sólo después del commit.
mod complementary;
mod documents;
mod formularies;
mod legal;
mod technical;

use crate::actions::{available_actions, Action};
use crate::artifacts::{build_request, generate_with_timeout, ArtifactGenerator, ArtifactKind};
use crate::config::WorkflowConfig;
use crate::context::{ActionContext, TransitionOutcome};
use crate::errors::WorkflowError;
use crate::files::FileStore;
use crate::guard::AdmissionGuards;
use crate::notifications::{StateNotification, StateNotifier};
use crate::registry::{DocumentRegistry, DocumentSlot};
use crate::tracking::{self, labelled};
use crate::transition::Transition;
use admisiones_domain::{Actor, Admission, AdmissionFilter, AdmissionRecord, AdmissionRepository, AdmissionState,
                        AdmissionType, ArtifactRefs, DocumentStatus, LegalState, RejectionMotive, ReportState, Role,
                        SaveResult};
use chrono::Utc;
use historial::{HistoryChange, HistoryEntry, HistoryLog, HistoryRepository, PersistResult, StateAxis};
use std::sync::Arc;
use uuid::Uuid;

pub struct AdmissionStateMachine {
  repo: Arc<dyn AdmissionRepository>,
  history: HistoryLog<dyn HistoryRepository>,
  files: Arc<dyn FileStore>,
  artifacts: Arc<dyn ArtifactGenerator>,
  notifier: Arc<dyn StateNotifier>,
  registry: DocumentRegistry,
  guards: AdmissionGuards,
  config: WorkflowConfig,
}

impl AdmissionStateMachine {
  pub fn new(repo: Arc<dyn AdmissionRepository>,
             history: Arc<dyn HistoryRepository>,
             files: Arc<dyn FileStore>,
             artifacts: Arc<dyn ArtifactGenerator>,
             notifier: Arc<dyn StateNotifier>,
             config: WorkflowConfig)
             -> Self {
    Self { registry: DocumentRegistry::new(repo.clone(), config.catalog_ttl),
           guards: AdmissionGuards::new(),
           history: HistoryLog::new(history),
           repo,
           files,
           artifacts,
           notifier,
           config }
  }

  pub fn config(&self) -> &WorkflowConfig {
    &self.config
  }

  pub fn registry(&self) -> &DocumentRegistry {
    &self.registry
  }

  pub fn repository(&self) -> &Arc<dyn AdmissionRepository> {
    &self.repo
  }

  // ---- lectura ----

  pub fn get(&self, admission_id: &Uuid) -> Result<AdmissionRecord, WorkflowError> {
    self.repo
        .get_admission(admission_id)?
        .ok_or_else(|| WorkflowError::NotFound(format!("admisión {}", admission_id)))
  }

  pub fn list(&self, filter: &AdmissionFilter) -> Result<Vec<Admission>, WorkflowError> {
    Ok(self.repo.list_admissions(filter)?.into_iter().map(|r| r.admission).collect())
  }

  pub fn history(&self, admission_id: &Uuid) -> Result<Vec<HistoryEntry>, WorkflowError> {
    Ok(self.history.entries(admission_id)?)
  }

  pub fn documents(&self, admission_id: &Uuid) -> Result<Vec<DocumentSlot>, WorkflowError> {
    let record = self.get(admission_id)?;
    self.registry.list_for(&record)
  }

  pub fn available_actions(&self, admission_id: &Uuid, actor: &Actor) -> Result<Vec<Action>, WorkflowError> {
    Ok(available_actions(&self.get(admission_id)?, actor))
  }

  pub fn mandatory_documents_complete(&self, admission_id: &Uuid) -> Result<bool, WorkflowError> {
    let record = self.get(admission_id)?;
    let catalog = self.registry.catalog_for(&record.admission.convenio_type_id)?;
    Ok(record.mandatory_documents_complete(&catalog))
  }

  pub fn mandatory_documents_have_files(&self, admission_id: &Uuid) -> Result<bool, WorkflowError> {
    let record = self.get(admission_id)?;
    let catalog = self.registry.catalog_for(&record.admission.convenio_type_id)?;
    Ok(record.mandatory_documents_have_files(&catalog))
  }

  // ---- alta ----

  /// Crea una admisión en `convention_selected` y registra el estado
  /// inicial.
  pub fn create_admission(&self,
                          kitchen_id: Uuid,
                          convenio_type_id: Uuid,
                          admission_type: AdmissionType,
                          actor: &Actor,
                          command_id: Option<Uuid>)
                          -> Result<TransitionOutcome, WorkflowError> {
    if !actor.has_any(&[Role::Technician, Role::DuplaTechnician, Role::Coordinator]) {
      return Err(WorkflowError::denied("create_admission", actor));
    }
    self.repo
        .get_kitchen(&kitchen_id)?
        .ok_or_else(|| WorkflowError::NotFound(format!("comedor {}", kitchen_id)))?;
    self.repo
        .get_convenio(&convenio_type_id)?
        .ok_or_else(|| WorkflowError::NotFound(format!("convenio {}", convenio_type_id)))?;
    let record = AdmissionRecord::new(Admission::new(kitchen_id, convenio_type_id, admission_type, actor.id()));
    let id = record.id();
    let initial = HistoryChange::StateChange { axis: StateAxis::Admission,
                                               from: None,
                                               to: labelled(AdmissionState::ConventionSelected),
                                               reason: None };
    self.repo.insert_admission(record.clone())?;
    let recorded = match self.history.record(id, actor.id(), command_id, vec![initial]) {
      Ok(PersistResult::Conflict) => Err(WorkflowError::ConflictingConcurrentTransition(format!("historial de {}", id))),
      Ok(_) => Ok(()),
      Err(e) => Err(e.into()),
    };
    if let Err(e) = recorded {
      log::warn!("admisión {}: no se pudo registrar la creación, se descarta ({})", id, e);
      self.repo.remove_admission(&id)?;
      return Err(e);
    }
    log::info!("admisión {} creada por {}", id, actor.id());
    Ok(self.outcome(record, actor, Vec::new(), false))
  }

  // ---- núcleo transaccional ----

  fn outcome(&self, record: AdmissionRecord, actor: &Actor, warnings: Vec<String>, replayed: bool) -> TransitionOutcome {
    let available_actions = available_actions(&record, actor);
    TransitionOutcome { version: record.version,
                        admission: record.admission,
                        available_actions,
                        warnings,
                        replayed }
  }

  /// Ejecuta `op` como una transición completa sobre la admisión del
  /// contexto.
  ///
  /// Sin versión esperada explícita vale la leída antes de tomar el guard;
  /// un guard ocupado o una escritura intermedia son un conflicto y nunca
  /// una espera.
  pub(crate) fn transact<F>(&self, ctx: &ActionContext, operation: &'static str, op: F)
                            -> Result<TransitionOutcome, WorkflowError>
    where F: FnOnce(&mut Transition<'_>) -> Result<(), WorkflowError>
  {
    let seen = self.get(&ctx.admission_id)?.version;
    let _guard = self.guards.acquire(ctx.admission_id, operation)?;
    let original = self.get(&ctx.admission_id)?;

    if let Some(command_id) = &ctx.command_id {
      if self.history.has_command(&ctx.admission_id, command_id)? {
        log::debug!("admisión {}: comando {} ya aplicado", ctx.admission_id, command_id);
        return Ok(self.outcome(original, &ctx.actor, Vec::new(), true));
      }
    }
    let expected = ctx.expected_version.unwrap_or(seen);
    if expected != original.version {
      return Err(WorkflowError::ConflictingConcurrentTransition(format!("versión esperada {}, actual {}",
                                                                        expected, original.version)));
    }
    if original.admission.archived {
      return Err(WorkflowError::invalid(operation, "admission_archived"));
    }
    if let Some(action) = ctx.action {
      if !action.permits(&ctx.actor, &original) {
        return Err(WorkflowError::denied(action.key(), &ctx.actor));
      }
    }

    let convenio = self.repo
                       .get_convenio(&original.admission.convenio_type_id)?
                       .ok_or_else(|| WorkflowError::NotFound(format!("convenio {}", original.admission.convenio_type_id)))?;
    let catalog = self.registry.catalog_for(&convenio.id)?;
    let kitchen = self.repo.get_kitchen(&original.admission.kitchen_id)?;
    let mut tx = Transition::new(operation, &ctx.actor, original.clone(), catalog, convenio, kitchen);

    if let Err(e) = op(&mut tx) {
      self.discard(tx);
      return Err(e.in_operation(operation));
    }
    self.commit(ctx, tx, original)
  }

  fn discard(&self, tx: Transition) {
    for handle in &tx.created_files {
      if let Err(e) = self.files.delete(handle) {
        log::warn!("no se pudo descartar el archivo {}: {}", handle, e);
      }
    }
    tx.deletes.rollback();
  }

  fn commit(&self, ctx: &ActionContext, mut tx: Transition, original: AdmissionRecord)
            -> Result<TransitionOutcome, WorkflowError> {
    let mut changes = std::mem::take(&mut tx.changes);
    changes.extend(tracking::diff(&original.admission, &tx.record.admission));
    if changes.is_empty() && tx.record == original {
      self.discard(tx);
      return Ok(self.outcome(original, &ctx.actor, Vec::new(), false));
    }

    let mut record = tx.record.clone();
    record.admission.updated_at = Utc::now();
    let new_version = match self.repo.save_admission(record.clone(), original.version) {
      Ok(SaveResult::Saved { new_version }) => new_version,
      Ok(SaveResult::Conflict) => {
        self.discard(tx);
        return Err(WorkflowError::ConflictingConcurrentTransition(format!("admisión {}", original.id())));
      }
      Err(e) => {
        self.discard(tx);
        return Err(e.into());
      }
    };
    record.version = new_version;

    let entries = changes.len();
    let persisted = self.history.record(original.id(), ctx.actor.id(), ctx.command_id, changes);
    let history_error = match persisted {
      Ok(PersistResult::Ok { .. }) => None,
      Ok(PersistResult::Conflict) => {
        Some(WorkflowError::ConflictingConcurrentTransition(format!("historial de {}", original.id())))
      }
      Err(e) => Some(WorkflowError::from(e)),
    };
    if let Some(err) = history_error {
      if let Err(e) = self.repo.save_admission(original.clone(), new_version) {
        log::warn!("no se pudo revertir la admisión {}: {}", original.id(), e);
      }
      self.discard(tx);
      return Err(err);
    }

    let failed = std::mem::take(&mut tx.deletes).commit(self.files.as_ref());
    if !failed.is_empty() {
      log::warn!("admisión {}: {} archivos quedaron sin borrar", original.id(), failed.len());
    }
    for event in &tx.events {
      self.notifier.notify(&StateNotification { admission: record.admission.clone(),
                                                kitchen: tx.kitchen.clone(),
                                                event: *event });
    }
    log::info!("admisión {}: {} por {} ({} registros, versión {})",
               original.id(),
               tx.operation,
               ctx.actor.id(),
               entries,
               new_version);
    let warnings = std::mem::take(&mut tx.warnings);
    Ok(self.outcome(record, &ctx.actor, warnings, false))
  }

  // ---- artefactos ----

  /// Genera un artefacto dentro de la transición. Un fallo queda como
  /// advertencia y devuelve `None`.
  pub(crate) fn generate(&self, tx: &mut Transition, kind: ArtifactKind) -> Option<ArtifactRefs> {
    let result = build_request(kind, &tx.record, &tx.convenio, tx.kitchen.as_ref())
      .and_then(|req| generate_with_timeout(self.artifacts.clone(), req, self.config.artifact_timeout));
    match result {
      Ok(refs) => Some(refs),
      Err(e) => {
        tx.warn(kind.code(), e.to_string());
        None
      }
    }
  }

  /// Regenera un artefacto que quedó sin referencias tras un fallo.
  pub fn retry_artifacts(&self, ctx: &ActionContext, kind: ArtifactKind) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "retry_artifacts", |tx| {
      let missing = match kind {
        ArtifactKind::TechnicalReportDraft => {
          tx.record.technical_report.as_ref().map(|r| !r.draft_artifacts().is_complete())
        }
        ArtifactKind::TechnicalReportFinal => tx.record
                                                .technical_report
                                                .as_ref()
                                                .filter(|r| r.state().is_validated_or_later())
                                                .map(|r| !r.final_artifacts().is_complete()),
        ArtifactKind::ConvenioProject | ArtifactKind::DispositionProject => {
          tx.record.formulary(formularies::kind_of(kind)).map(|f| !f.artifacts.is_complete())
        }
      };
      match missing {
        None => return Err(tx.fail("artifact_source_missing")),
        Some(false) => return Err(tx.fail("artifacts_present")),
        Some(true) => {}
      }
      let refs = match self.generate(tx, kind) {
        Some(refs) => refs,
        None => return Ok(()),
      };
      match kind {
        ArtifactKind::TechnicalReportDraft => {
          if let Some(r) = tx.record.technical_report.as_mut() {
            r.set_draft_artifacts(refs);
          }
        }
        ArtifactKind::TechnicalReportFinal => {
          if let Some(r) = tx.record.technical_report.as_mut() {
            r.set_final_artifacts(refs);
          }
        }
        ArtifactKind::ConvenioProject | ArtifactKind::DispositionProject => {
          if let Some(f) = tx.record.formulary_mut(formularies::kind_of(kind)).as_mut() {
            f.artifacts = refs;
          }
        }
      }
      Ok(())
    })
  }
}

// ---- derivaciones ----

/// Avance automático por aristas hacia adelante mientras el agregado lo
/// respalde.
pub(crate) fn advance(tx: &mut Transition) -> Result<(), WorkflowError> {
  use AdmissionState::*;
  loop {
    let report = tx.record.technical_report.as_ref().map(|r| r.state());
    let a = &tx.record.admission;
    let resume_legal = a.sent_to_legal && a.legal_state != Some(LegalState::ToRectify);
    let next = match a.admission_state {
      DocumentationInProgress
        if tx.record.mandatory_documents_have_files(&tx.catalog) && !mandatory_awaiting_rectification(tx) =>
      {
        Some(DocumentationFinalized)
      }
      DocumentationFinalized if tx.record.mandatory_documents_complete(&tx.catalog) => Some(DocumentationApproved),
      DocumentationApproved if report.is_some() => Some(TechnicalReportDrafted),
      TechnicalReportDrafted if report.map(|r| r.is_validated_or_later()).unwrap_or(false) => {
        Some(TechnicalReportFinalized)
      }
      TechnicalReportFinalized if matches!(report, Some(ReportState::DocxGenerated) | Some(ReportState::DocxEdited)) => {
        Some(TechnicalReportDocxGenerated)
      }
      TechnicalReportDocxGenerated if report == Some(ReportState::DocxEdited) => Some(TechnicalReportDocxEdited),
      TechnicalReportFinalized | TechnicalReportDocxGenerated | TechnicalReportDocxEdited if resume_legal => {
        Some(SentToLegal)
      }
      _ => None,
    };
    match next {
      Some(n) => tx.move_admission(n, None)?,
      None => return Ok(()),
    }
  }
}

fn mandatory_awaiting_rectification(tx: &Transition) -> bool {
  tx.record.documents.iter().any(|d| d.mandatory && d.status() == DocumentStatus::ToRectify)
}

/// Retroceso a `documentation_in_progress` por un cambio de documento.
/// Devuelve `true` si hubo retroceso.
pub(crate) fn regress_for_document(tx: &mut Transition,
                                   mandatory: bool,
                                   previous: Option<DocumentStatus>,
                                   next: DocumentStatus,
                                   reason: Option<String>)
                                   -> Result<bool, WorkflowError> {
  use AdmissionState::*;
  let state = tx.admission_state();
  if matches!(state, ConventionSelected | DocumentationInProgress) || state.is_past(TechnicalReportDocxEdited) {
    return Ok(false);
  }
  let away_from_accepted = mandatory && previous == Some(DocumentStatus::Accepted) && next != DocumentStatus::Accepted;
  let rectify_while_finalized = next == DocumentStatus::ToRectify && state == DocumentationFinalized;
  if away_from_accepted || rectify_while_finalized {
    tx.move_admission(DocumentationInProgress, reason)?;
    return Ok(true);
  }
  Ok(false)
}

/// Eje legal en la etapa de formularios: el proyecto de convenio cargado
/// lleva a `convenio_formulary_loaded`; ambos formularios con número de IF
/// llevan a `disposition_formulary_loaded`. Si un reemplazo deja un número
/// vacío, se vuelve a `convenio_formulary_loaded`.
pub(crate) fn advance_legal(tx: &mut Transition) -> Result<(), WorkflowError> {
  use LegalState::*;
  loop {
    let numbered = tx.record.formularies_numbered();
    let next = match tx.legal_state() {
      Some(ExpedienteAdded) if tx.record.convenio_formulary.is_some() => Some(ConvenioFormularyLoaded),
      Some(ConvenioFormularyLoaded) if numbered => Some(DispositionFormularyLoaded),
      Some(DispositionFormularyLoaded) if !numbered => Some(ConvenioFormularyLoaded),
      _ => None,
    };
    match next {
      Some(n) => tx.move_legal(n, None)?,
      None => return Ok(()),
    }
  }
}

/// Rechazo por dictamen a la espera del reinicio del formulario observado.
pub(crate) fn dictamen_pending(tx: &Transition) -> bool {
  let a = &tx.record.admission;
  a.legal_state == Some(LegalState::JuridicosRejected) && a.rejection_motive == Some(RejectionMotive::Dictamen)
}

/// Texto obligatorio del payload (observaciones, motivos, números).
pub(crate) fn required_text(value: &str, what: &str) -> Result<String, WorkflowError> {
  let v = value.trim();
  if v.is_empty() {
    return Err(WorkflowError::ValidationFailure(format!("Debe indicar {}", what)));
  }
  Ok(v.to_string())
}
