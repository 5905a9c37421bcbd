use super::{advance_legal, dictamen_pending, required_text, AdmissionStateMachine};
use crate::artifacts::ArtifactKind;
use crate::context::{ActionContext, TransitionOutcome};
use crate::errors::WorkflowError;
use crate::transition::Transition;
use admisiones_domain::{Choice, Formulary, FormularyKind, FormularyPayload, LegalState};
use historial::{ChangeValue, HistoryChange};

pub(crate) fn kind_of(kind: ArtifactKind) -> FormularyKind {
  match kind {
    ArtifactKind::DispositionProject => FormularyKind::DispositionProject,
    _ => FormularyKind::ConvenioProject,
  }
}

/// Estados legales en los que puede cargarse o reemplazarse cada formulario.
fn editable_in(kind: FormularyKind, state: Option<LegalState>) -> bool {
  use LegalState::*;
  match kind {
    FormularyKind::ConvenioProject => matches!(state,
                                               Some(ExpedienteAdded)
                                               | Some(ConvenioFormularyLoaded)
                                               | Some(DispositionFormularyLoaded)
                                               | Some(JuridicosRejected)),
    FormularyKind::DispositionProject => {
      matches!(state, Some(ConvenioFormularyLoaded) | Some(DispositionFormularyLoaded) | Some(JuridicosRejected))
    }
  }
}

fn locked(state: Option<LegalState>) -> bool {
  use LegalState::*;
  matches!(state,
           Some(JuridicosValidated)
           | Some(SgaReportGenerated)
           | Some(DispositionGenerated)
           | Some(ConvenioSigned)
           | Some(Finalized))
}

/// Descarta un formulario. Sus artefactos quedan en manos del generador:
/// sólo se sueltan las referencias.
pub(crate) fn drop_formulary(tx: &mut Transition, kind: FormularyKind, reason: &str) -> bool {
  match tx.record.formulary_mut(kind).take() {
    Some(_) => {
      tx.push(HistoryChange::FieldChange { field: format!("{}.estado", kind.code()),
                                           label: kind.display().to_string(),
                                           before: ChangeValue::Text("cargado".to_string()),
                                           after: ChangeValue::Text(reason.to_string()) });
      true
    }
    None => false,
  }
}

impl AdmissionStateMachine {
  /// Alta o reemplazo del proyecto de convenio o de disposición. Reemplazar
  /// borra el número de IF y vuelve a generar los artefactos.
  pub fn save_formulary(&self, ctx: &ActionContext, kind: FormularyKind, payload: FormularyPayload)
                        -> Result<TransitionOutcome, WorkflowError> {
    let operation = match kind {
      FormularyKind::ConvenioProject => "save_convenio_formulary",
      FormularyKind::DispositionProject => "save_disposition_formulary",
    };
    self.transact(ctx, operation, |tx| {
      let state = tx.legal_state();
      if locked(state) {
        return Err(tx.fail("formulary_locked"));
      }
      if !editable_in(kind, state) {
        return Err(tx.fail("legal_state_not_ready"));
      }
      if dictamen_pending(tx) {
        return Err(tx.fail("dictamen_reset_pending"));
      }
      if kind == FormularyKind::DispositionProject && tx.record.convenio_formulary.is_none() {
        return Err(tx.fail("convenio_formulary_missing"));
      }
      payload.validate(&tx.convenio, tx.record.admission.admission_type)?;

      let admission_type = tx.record.admission.admission_type;
      let replaced = tx.record.formulary(kind).is_some();
      let formulary = match tx.record.formulary_mut(kind).take() {
        Some(mut existing) => {
          existing.payload = payload;
          existing.if_number = None;
          existing.artifacts = Default::default();
          existing
        }
        None => Formulary::new(kind, payload, admission_type, tx.actor.id()),
      };
      *tx.record.formulary_mut(kind) = Some(formulary);
      tx.push(HistoryChange::FieldChange { field: format!("{}.estado", kind.code()),
                                           label: kind.display().to_string(),
                                           before: if replaced {
                                             ChangeValue::Text("cargado".to_string())
                                           } else {
                                             ChangeValue::Empty
                                           },
                                           after: ChangeValue::Text(if replaced { "reemplazado" } else { "cargado" }.to_string()) });

      if let Some(refs) = self.generate(tx, ArtifactKind::for_formulary(kind)) {
        if let Some(f) = tx.record.formulary_mut(kind).as_mut() {
          f.artifacts = refs;
        }
      }
      advance_legal(tx)
    })
  }

  /// Número de IF del formulario ya cargado.
  pub fn set_formulary_if_number(&self, ctx: &ActionContext, kind: FormularyKind, number: &str)
                                 -> Result<TransitionOutcome, WorkflowError> {
    self.transact(ctx, "set_formulary_if_number", |tx| {
      let number = required_text(number, "el número de IF del formulario")?;
      if locked(tx.legal_state()) {
        return Err(tx.fail("formulary_locked"));
      }
      if dictamen_pending(tx) {
        return Err(tx.fail("dictamen_reset_pending"));
      }
      let formulary = tx.record
                        .formulary_mut(kind)
                        .as_mut()
                        .ok_or_else(|| WorkflowError::invalid("set_formulary_if_number", "formulary_missing"))?;
      let before = ChangeValue::text(formulary.if_number.as_deref());
      formulary.if_number = Some(number.clone());
      tx.push(HistoryChange::FieldChange { field: format!("{}.numero_if", kind.code()),
                                           label: format!("Número de IF ({})", kind.display()),
                                           before,
                                           after: ChangeValue::Text(number) });
      advance_legal(tx)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn disposition_needs_convenio_stage() {
    assert!(!editable_in(FormularyKind::DispositionProject, Some(LegalState::ExpedienteAdded)));
    assert!(editable_in(FormularyKind::ConvenioProject, Some(LegalState::ExpedienteAdded)));
    assert!(editable_in(FormularyKind::DispositionProject, Some(LegalState::JuridicosRejected)));
    assert!(!editable_in(FormularyKind::ConvenioProject, None));
    assert!(locked(Some(LegalState::JuridicosValidated)));
  }

  #[test]
  fn artifact_kind_maps_to_formulary() {
    assert_eq!(kind_of(ArtifactKind::DispositionProject), FormularyKind::DispositionProject);
    assert_eq!(kind_of(ArtifactKind::ConvenioProject), FormularyKind::ConvenioProject);
  }
}
