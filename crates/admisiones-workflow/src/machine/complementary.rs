use super::{required_text, AdmissionStateMachine};
use crate::context::{ActionContext, TransitionOutcome};
use crate::errors::WorkflowError;
use crate::transition::Transition;
use admisiones_domain::{ComplementaryDecision, ComplementaryReport, Role};
use historial::{ChangeValue, HistoryChange};
use serde_json::{json, Value as JsonValue};

fn action(tx: &mut Transition, action: &str, detail: JsonValue) {
  tx.push(HistoryChange::ComplementaryAction { action: action.to_string(), detail });
}

impl AdmissionStateMachine {
  /// Jurídicos pide un informe complementario sobre el informe técnico
  /// validado.
  pub fn solicit_complementary(&self, ctx: &ActionContext, observations: &str) -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "solicit_complementary", |tx| {
      let observations = required_text(observations, "las observaciones del pedido")?;
      if !tx.record.report_validated() {
        return Err(tx.fail("report_not_validated"));
      }
      if !tx.legal_state().map(|l| l.admits_complementary()).unwrap_or(false) {
        return Err(tx.fail("legal_state_not_ready"));
      }
      if tx.record.admission.complementary_requested {
        return Err(tx.fail("complementary_already_requested"));
      }
      let a = &mut tx.record.admission;
      a.complementary_requested = true;
      a.complementary_observations = Some(observations);
      Ok(())
    })
  }

  /// Propone sobrescrituras de campos del informe técnico. Reemplaza las
  /// propuestas anteriores; crea el complementario si no hay uno activo.
  pub fn stage_complementary(&self, ctx: &ActionContext, overrides: Vec<(String, JsonValue)>)
                             -> Result<TransitionOutcome, WorkflowError> {
    if !ctx.actor.is_technician() {
      return Err(WorkflowError::denied("stage_complementary", &ctx.actor));
    }
    self.transact(ctx, "stage_complementary", |tx| {
      if !tx.record.admission.complementary_requested {
        return Err(tx.fail("complementary_not_requested"));
      }
      let report = tx.record
                     .technical_report
                     .as_ref()
                     .ok_or_else(|| WorkflowError::invalid("stage_complementary", "report_missing"))?;
      report.check_overrides(&overrides)?;
      let report_id = report.id();
      let fields: Vec<String> = overrides.iter().map(|(f, _)| f.clone()).collect();

      if tx.record.active_complementary().is_none() {
        tx.record.complementary = Some(ComplementaryReport::new(report_id, tx.actor.id()));
      }
      if let Some(c) = tx.record.complementary.as_mut() {
        c.stage(overrides)?;
      }
      action(tx, "staged", json!({ "campos": fields }));
      Ok(())
    })
  }

  pub fn submit_complementary(&self, ctx: &ActionContext) -> Result<TransitionOutcome, WorkflowError> {
    if !ctx.actor.is_technician() {
      return Err(WorkflowError::denied("submit_complementary", &ctx.actor));
    }
    self.transact(ctx, "submit_complementary", |tx| {
      match tx.record.complementary.as_mut().filter(|c| c.is_active()) {
        Some(c) => c.submit()?,
        None => return Err(tx.fail("complementary_missing")),
      }
      action(tx, "submitted", JsonValue::Null);
      Ok(())
    })
  }

  /// Revisión de jurídicos. Aprobar aplica todas las sobrescrituras al
  /// informe técnico en la misma transición.
  pub fn review_complementary(&self, ctx: &ActionContext, decision: ComplementaryDecision, observations: Option<&str>)
                              -> Result<TransitionOutcome, WorkflowError> {
    if !ctx.actor.has_any(&[Role::DuplaLawyer, Role::LegalArea]) {
      return Err(WorkflowError::denied("review_complementary", &ctx.actor));
    }
    self.transact(ctx, "review_complementary", |tx| {
      let complementary = tx.record
                            .complementary
                            .as_mut()
                            .filter(|c| c.is_active())
                            .ok_or_else(|| WorkflowError::invalid("review_complementary", "complementary_missing"))?;
      match decision {
        ComplementaryDecision::Rectify => {
          let observations = required_text(observations.unwrap_or_default(), "las observaciones de la rectificación")?;
          complementary.rectify(&observations)?;
          action(tx, "rectify", json!({ "observaciones": observations }));
        }
        ComplementaryDecision::Approved => {
          let approved = complementary.approve()?;
          let report = tx.record
                         .technical_report
                         .as_mut()
                         .filter(|r| r.id() == approved.report_id())
                         .ok_or_else(|| WorkflowError::invalid("review_complementary", "report_missing"))?;
          let applied = report.apply_complementary(&approved)?;
          for (field, before, after) in applied {
            tx.push(HistoryChange::FieldChange { label: format!("Informe técnico: {}", field),
                                                 field: format!("informe_tecnico.{}", field),
                                                 before: ChangeValue::from_json(&before),
                                                 after: ChangeValue::from_json(&after) });
          }
          action(tx, "approved", json!({ "observaciones": observations }));
          tx.record.admission.complementary_requested = false;
        }
      }
      Ok(())
    })
  }
}
