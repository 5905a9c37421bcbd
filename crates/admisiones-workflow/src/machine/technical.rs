use super::{advance, required_text, AdmissionStateMachine};
use crate::artifacts::ArtifactKind;
use crate::context::{ActionContext, TransitionOutcome};
use crate::errors::WorkflowError;
use crate::files::Upload;
use crate::notifications::StateEvent;
use crate::tracking::labelled;
use crate::transition::Transition;
use admisiones_domain::{AdmissionState, ReportState, ReviewDecision, Role, SaveAction, TechnicalReport};
use historial::{ChangeValue, HistoryChange};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

fn report_state_change(tx: &mut Transition, before: Option<ReportState>, after: ReportState) {
  if before == Some(after) {
    return;
  }
  tx.push(HistoryChange::FieldChange { field: "informe_tecnico.estado".to_string(),
                                       label: "Estado del informe técnico".to_string(),
                                       before: before.map(|s| ChangeValue::Choice(labelled(s)))
                                                     .unwrap_or(ChangeValue::Empty),
                                       after: ChangeValue::Choice(labelled(after)) });
}

impl AdmissionStateMachine {
  /// Guardado del informe técnico por el técnico. `submit` lo envía a
  /// revisión y genera el borrador.
  pub fn save_report(&self, ctx: &ActionContext, payload: IndexMap<String, JsonValue>, action: SaveAction)
                     -> Result<TransitionOutcome, WorkflowError> {
    if !ctx.actor.is_technician() {
      return Err(WorkflowError::denied("save_report", &ctx.actor));
    }
    self.transact(ctx, "save_report", |tx| {
      let state = tx.admission_state();
      if tx.record.admission.sent_to_legal || state.is_terminal() {
        return Err(tx.fail("report_locked"));
      }
      if tx.record.technical_report.is_none() && !(state == AdmissionState::DocumentationApproved
                                                   || state.is_past(AdmissionState::DocumentationApproved))
      {
        return Err(tx.fail("documentation_not_approved"));
      }
      let before = tx.record.technical_report.as_ref().map(|r| r.state());
      let admission_type = tx.record.admission.admission_type;
      let actor_id = tx.actor.id().to_string();
      let report = tx.record
                     .technical_report
                     .get_or_insert_with(|| TechnicalReport::new(admission_type, &actor_id));
      report.save(&payload, action)?;
      let after = report.state();
      report_state_change(tx, before, after);
      if action == SaveAction::Submit {
        if let Some(refs) = self.generate(tx, ArtifactKind::TechnicalReportDraft) {
          if let Some(r) = tx.record.technical_report.as_mut() {
            r.set_draft_artifacts(refs);
          }
        }
      }
      advance(tx)
    })
  }

  /// Revisión del coordinador. Validar genera el informe final y avanza la
  /// admisión.
  pub fn review_report(&self,
                       ctx: &ActionContext,
                       decision: ReviewDecision,
                       amend_fields: &[String],
                       observation: Option<&str>)
                       -> Result<TransitionOutcome, WorkflowError> {
    if !ctx.actor.has_any(&[Role::Coordinator]) {
      return Err(WorkflowError::denied("review_report", &ctx.actor));
    }
    self.transact(ctx, "review_report", |tx| {
      let report = tx.record.technical_report.as_mut().ok_or_else(|| WorkflowError::invalid("review_report", "report_missing"))?;
      let before = report.state();
      report.review(decision, amend_fields, observation)?;
      let after = report.state();
      report_state_change(tx, Some(before), after);
      if decision == ReviewDecision::Validated {
        if let Some(refs) = self.generate(tx, ArtifactKind::TechnicalReportFinal) {
          if let Some(r) = tx.record.technical_report.as_mut() {
            r.set_final_artifacts(refs);
          }
        }
        tx.event(StateEvent::TechnicalReportValidated);
      }
      advance(tx)
    })
  }

  /// IF del informe técnico: `validated -> docx_generated`.
  pub fn set_technical_if_number(&self, ctx: &ActionContext, number: &str) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "set_technical_if_number", |tx| {
      let number = required_text(number, "el número de IF del informe técnico")?;
      let report = tx.record
                     .technical_report
                     .as_mut()
                     .ok_or_else(|| WorkflowError::invalid("set_technical_if_number", "report_missing"))?;
      report.mark_docx_generated()?;
      report_state_change(tx, Some(ReportState::Validated), ReportState::DocxGenerated);
      let before = ChangeValue::text(tx.record.admission.technical_if_number.as_deref());
      tx.record.admission.technical_if_number = Some(number.clone());
      tx.push(HistoryChange::FieldChange { field: "numero_if_tecnico".to_string(),
                                           label: "Número de IF técnico".to_string(),
                                           before,
                                           after: ChangeValue::Text(number) });
      advance(tx)
    })
  }

  /// DOCX final editado por el técnico: `docx_generated -> docx_edited`.
  pub fn upload_edited_docx(&self, ctx: &ActionContext, upload: Upload) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "upload_edited_docx", |tx| {
      if tx.record.technical_report.as_ref().map(|r| r.state()) != Some(ReportState::DocxGenerated) {
        return Err(tx.fail("report_docx_not_generated"));
      }
      let handle = self.files.put(&upload)?;
      tx.created_file(handle.clone());
      if let Some(report) = tx.record.technical_report.as_mut() {
        if let Some(old) = report.upload_edited_docx(handle)? {
          tx.deletes.enqueue(old);
        }
      }
      report_state_change(tx, Some(ReportState::DocxGenerated), ReportState::DocxEdited);
      advance(tx)
    })
  }
}
