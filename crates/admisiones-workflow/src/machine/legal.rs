use super::formularies::drop_formulary;
use super::{advance, dictamen_pending, required_text, AdmissionStateMachine};
use crate::context::{ActionContext, TransitionOutcome};
use crate::errors::WorkflowError;
use crate::files::Upload;
use crate::notifications::StateEvent;
use crate::transition::Transition;
use admisiones_domain::{AdmissionState, DictamenDetail, FormularyKind, LegalIntervention, LegalState, RejectionMotive};
use historial::{ChangeValue, HistoryChange};

/// Reinicio por dictamen: descarta el formulario observado y vuelve el eje
/// legal al estado previo a su carga.
fn reset_for_dictamen(tx: &mut Transition, detail: DictamenDetail) -> Result<(), WorkflowError> {
  let target = detail.target();
  if tx.record.formulary(target).is_none() {
    return Err(tx.fail("formulary_missing"));
  }
  drop_formulary(tx, target, "descartado por dictamen");
  let back_to = match target {
    FormularyKind::ConvenioProject => LegalState::ExpedienteAdded,
    FormularyKind::DispositionProject => LegalState::ConvenioFormularyLoaded,
  };
  tx.move_legal(back_to, Some("Reinicio por dictamen".to_string()))
}

fn number_change(field: &str, label: &str, before: Option<&str>, after: &str) -> HistoryChange {
  HistoryChange::FieldChange { field: field.to_string(),
                               label: label.to_string(),
                               before: ChangeValue::text(before),
                               after: ChangeValue::Text(after.to_string()) }
}

impl AdmissionStateMachine {
  /// Envío a legales. Requiere el informe técnico validado y la
  /// documentación obligatoria completa.
  pub fn send_to_legal(&self, ctx: &ActionContext) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "send_to_legal", |tx| {
      if tx.record.admission.sent_to_legal {
        return Err(tx.fail("already_sent_to_legal"));
      }
      match tx.record.technical_report.as_ref().map(|r| r.state()) {
        None => return Err(tx.fail("report_missing")),
        Some(s) if !s.is_validated_or_later() => return Err(tx.fail("report_not_validated")),
        Some(_) => {}
      }
      if !matches!(tx.admission_state(),
                   AdmissionState::TechnicalReportFinalized
                   | AdmissionState::TechnicalReportDocxGenerated
                   | AdmissionState::TechnicalReportDocxEdited)
      {
        return Err(tx.fail("report_not_finalized"));
      }
      if !tx.record.mandatory_documents_complete(&tx.catalog) {
        return Err(tx.fail("documentation_incomplete"));
      }
      tx.record.admission.sent_to_legal = true;
      tx.move_legal(LegalState::EnviadoLegales, None)?;
      tx.move_admission(AdmissionState::SentToLegal, None)
    })
  }

  /// Legales devuelve la documentación: la admisión vuelve a
  /// `documentation_in_progress` con las observaciones.
  pub fn send_to_rectify(&self, ctx: &ActionContext, observations: &str) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "send_to_rectify", |tx| {
      let observations = required_text(observations, "las observaciones de la rectificación")?;
      tx.move_legal(LegalState::ToRectify, Some(observations.clone()))?;
      tx.record.admission.rectification_observations = Some(observations.clone());
      tx.move_admission(AdmissionState::DocumentationInProgress, Some(observations))
    })
  }

  /// El técnico da por rectificada la documentación. La admisión vuelve a
  /// avanzar mientras los documentos lo respalden.
  pub fn mark_documentation_rectified(&self, ctx: &ActionContext) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "mark_documentation_rectified", |tx| {
      if tx.legal_state() != Some(LegalState::ToRectify) {
        return Err(tx.fail("legal_not_to_rectify"));
      }
      tx.move_legal(LegalState::Rectified, None)?;
      tx.record.admission.rectification_observations = None;
      advance(tx)
    })
  }

  pub fn set_legal_if(&self, ctx: &ActionContext, number: &str) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "set_legal_if", |tx| {
      let number = required_text(number, "el número de IF de legales")?;
      if !matches!(tx.legal_state(), Some(LegalState::EnviadoLegales) | Some(LegalState::Rectified)) {
        return Err(tx.fail("legal_state_not_ready"));
      }
      let change = number_change("numero_if_legales",
                                 "Número de IF de legales",
                                 tx.record.admission.legal_if_number.as_deref(),
                                 &number);
      tx.push(change);
      tx.record.admission.legal_if_number = Some(number);
      tx.move_legal(LegalState::LegalIfAssigned, None)
    })
  }

  /// Caratulación: número de expediente.
  pub fn set_file_number(&self, ctx: &ActionContext, number: &str) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "set_file_number", |tx| {
      let number = required_text(number, "el número de expediente")?;
      if tx.legal_state() != Some(LegalState::LegalIfAssigned) {
        return Err(tx.fail("legal_if_missing"));
      }
      let change = number_change("numero_expediente", "Número de expediente", tx.record.admission.file_number.as_deref(), &number);
      tx.push(change);
      tx.record.admission.file_number = Some(number);
      tx.move_legal(LegalState::ExpedienteAdded, None)
    })
  }

  /// Intervención de jurídicos. Un rechazo por dictamen deja la admisión en
  /// `juridicos_rejected` hasta que se reinicie el formulario observado.
  pub fn validate_legal(&self,
                        ctx: &ActionContext,
                        intervention: LegalIntervention,
                        motive: Option<RejectionMotive>,
                        detail: Option<DictamenDetail>)
                        -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "validate_legal", |tx| {
      let state = tx.legal_state();
      if !matches!(state, Some(LegalState::DispositionFormularyLoaded) | Some(LegalState::JuridicosRejected)) {
        return Err(tx.fail("legal_state_not_ready"));
      }
      if dictamen_pending(tx) {
        return Err(tx.fail("dictamen_reset_pending"));
      }
      if tx.record.admission.has_open_rectification() {
        return Err(tx.fail("open_rectification"));
      }
      if tx.record.admission.legal_if_number.is_none() {
        return Err(tx.fail("legal_if_missing"));
      }
      if !tx.record.formularies_numbered() {
        return Err(tx.fail("formularies_incomplete"));
      }

      let a = &mut tx.record.admission;
      a.legal_intervention = Some(intervention);
      match intervention {
        LegalIntervention::Validated => {
          a.rejection_motive = None;
          a.dictamen_detail = None;
          tx.move_legal(LegalState::JuridicosValidated, None)
        }
        LegalIntervention::Rejected => {
          let motive = motive.ok_or_else(|| WorkflowError::ValidationFailure("Debe indicar el motivo del rechazo".to_string()))?;
          let detail = match motive {
            RejectionMotive::Dictamen => Some(detail.ok_or_else(|| {
                                          WorkflowError::ValidationFailure("Debe indicar el detalle del dictamen".to_string())
                                        })?),
            RejectionMotive::Providencia => None,
          };
          a.rejection_motive = Some(motive);
          a.dictamen_detail = detail;
          if state != Some(LegalState::JuridicosRejected) {
            tx.move_legal(LegalState::JuridicosRejected, None)?;
          }
          Ok(())
        }
      }
    })
  }

  /// Reinicio del flujo tras un rechazo por dictamen (`btnReinicioExpediente`).
  pub fn reset_dictamen_flow(&self, ctx: &ActionContext) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "reset_dictamen_flow", |tx| {
      let a = &tx.record.admission;
      if a.legal_state != Some(LegalState::JuridicosRejected) {
        return Err(tx.fail("legal_not_rejected"));
      }
      if a.rejection_motive != Some(RejectionMotive::Dictamen) {
        return Err(tx.fail("rejection_not_dictamen"));
      }
      let detail = a.dictamen_detail.ok_or_else(|| WorkflowError::invalid("reset_dictamen_flow", "dictamen_detail_missing"))?;
      reset_for_dictamen(tx, detail)
    })
  }

  pub fn record_sga_report(&self, ctx: &ActionContext) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "record_sga_report", |tx| {
      if tx.legal_state() != Some(LegalState::JuridicosValidated) {
        return Err(tx.fail("legal_not_validated"));
      }
      let a = &tx.record.admission;
      if a.legal_if_number.is_none() || a.file_number.is_none() {
        return Err(tx.fail("legal_identifiers_missing"));
      }
      tx.record.admission.sga_report_accepted = true;
      tx.move_legal(LegalState::SgaReportGenerated, None)
    })
  }

  /// Número de la disposición (RESO).
  pub fn record_disposition(&self, ctx: &ActionContext, number: &str) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "record_disposition", |tx| {
      let number = required_text(number, "el número de disposición")?;
      if tx.legal_state() != Some(LegalState::SgaReportGenerated) {
        return Err(tx.fail("sga_report_missing"));
      }
      let change = number_change("numero_disposicion",
                                 "Número de disposición",
                                 tx.record.admission.disposition_number.as_deref(),
                                 &number);
      tx.push(change);
      tx.record.admission.disposition_number = Some(number);
      tx.move_legal(LegalState::DispositionGenerated, None)
    })
  }

  /// Convenio firmado: número y, opcionalmente, el archivo escaneado.
  pub fn record_convenio_signed(&self, ctx: &ActionContext, number: &str, file: Option<Upload>)
                                -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "record_convenio_signed", |tx| {
      let number = required_text(number, "el número de convenio")?;
      if tx.legal_state() != Some(LegalState::DispositionGenerated) {
        return Err(tx.fail("disposition_missing"));
      }
      if let Some(upload) = &file {
        let handle = self.files.put(upload)?;
        tx.created_file(handle.clone());
        if let Some(old) = tx.record.admission.convenio_file.replace(handle) {
          tx.delete_after_commit(old);
        }
      }
      tx.record.admission.convenio_number = Some(number);
      tx.move_legal(LegalState::ConvenioSigned, None)
    })
  }

  /// Cierre del circuito legal: la admisión queda disponible para
  /// acompañamiento.
  pub fn make_available_to_accompaniment(&self, ctx: &ActionContext) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "make_available_to_accompaniment", |tx| {
      if tx.legal_state() != Some(LegalState::ConvenioSigned) {
        return Err(tx.fail("convenio_not_signed"));
      }
      if tx.admission_state() != AdmissionState::SentToLegal {
        return Err(tx.fail("admission_not_in_legal"));
      }
      tx.record.admission.sent_to_accompaniment = true;
      tx.move_legal(LegalState::Finalized, None)?;
      tx.move_admission(AdmissionState::Finalized, None)?;
      tx.event(StateEvent::AvailableForAccompaniment);
      Ok(())
    })
  }

  /// Cierre forzado desde cualquier estado no archivado. Deja un único
  /// registro en el historial con el motivo.
  pub fn force_close(&self, ctx: &ActionContext, reason: &str) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "force_close", |tx| {
      let reason = required_text(reason, "el motivo del cierre")?;
      tx.move_admission(AdmissionState::Archived, Some(reason.clone()))?;
      let a = &mut tx.record.admission;
      a.archived = true;
      a.closure_reason = Some(reason);
      Ok(())
    })
  }
}
