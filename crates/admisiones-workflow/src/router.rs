//! Punto de entrada de las acciones de la interfaz: resuelve la clave POST,
//! verifica archivo y permisos, interpreta el payload y delega en la
//! máquina de estados.
use crate::actions::Action;
use crate::context::{ActionContext, TransitionOutcome};
use crate::errors::WorkflowError;
use crate::files::Upload;
use crate::machine::AdmissionStateMachine;
use admisiones_domain::{Choice, DictamenDetail, FormularyKind, FormularyPayload, LegalIntervention, RejectionMotive};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ObservationsPayload {
  #[serde(default)]
  observaciones: String,
}

#[derive(Debug, Deserialize)]
struct NumberPayload {
  #[serde(default)]
  numero: String,
}

#[derive(Debug, Deserialize)]
struct UploadPayload {
  nombre: String,
  #[serde(default)]
  contenido: String,
}

impl From<UploadPayload> for Upload {
  fn from(p: UploadPayload) -> Self {
    Upload::new(&p.nombre, p.contenido.into_bytes())
  }
}

#[derive(Debug, Deserialize)]
struct ValidationPayload {
  intervencion: String,
  #[serde(default)]
  motivo: Option<String>,
  #[serde(default)]
  detalle: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomDocumentPayload {
  nombre: String,
  #[serde(default)]
  archivo: Option<UploadPayload>,
}

#[derive(Debug, Deserialize)]
struct ForceClosePayload {
  #[serde(default)]
  motivo: String,
}

#[derive(Debug, Deserialize)]
struct ConvenioSignedPayload {
  #[serde(default)]
  numero: String,
  #[serde(default)]
  archivo: Option<UploadPayload>,
}

fn parse<T>(payload: JsonValue) -> Result<T, WorkflowError>
  where T: DeserializeOwned
{
  serde_json::from_value(payload).map_err(|e| WorkflowError::ValidationFailure(format!("Payload inválido: {}", e)))
}

fn choice<C: Choice>(value: &str, what: &str) -> Result<C, WorkflowError> {
  C::parse_choice(value).ok_or_else(|| WorkflowError::ValidationFailure(format!("{} desconocido: '{}'", what, value)))
}

/// Despacha acciones por clave POST.
#[derive(Clone)]
pub struct TransitionRouter {
  machine: Arc<AdmissionStateMachine>,
}

impl TransitionRouter {
  pub fn new(machine: Arc<AdmissionStateMachine>) -> Self {
    Self { machine }
  }

  pub fn machine(&self) -> &Arc<AdmissionStateMachine> {
    &self.machine
  }

  /// Ejecuta la acción `key`. Una clave desconocida, o una acción sin
  /// grupos autorizados en el estado actual, se deniega.
  ///
  /// La verificación previa evita interpretar el payload de una acción que
  /// no corresponde; la que decide es la que hace la operación con el guard
  /// de la admisión tomado.
  pub fn dispatch(&self, key: &str, ctx: &ActionContext, payload: JsonValue) -> Result<TransitionOutcome, WorkflowError> {
    let action: Action = key.parse().map_err(|_| WorkflowError::denied(key, &ctx.actor))?;
    let record = self.machine.get(&ctx.admission_id)?;
    if record.admission.archived {
      return Err(WorkflowError::invalid(action.key(), "admission_archived"));
    }
    if !action.permits(&ctx.actor, &record) {
      log::debug!("admisión {}: {} denegada para {}", ctx.admission_id, action, ctx.actor);
      return Err(WorkflowError::denied(action.key(), &ctx.actor));
    }
    self.run(action, &ctx.clone().via(action), payload)
  }

  fn run(&self, action: Action, ctx: &ActionContext, payload: JsonValue) -> Result<TransitionOutcome, WorkflowError> {
    let m = &self.machine;
    match action {
      Action::SendToLegal => m.send_to_legal(ctx),
      Action::MakeAvailableToAccompaniment => m.make_available_to_accompaniment(ctx),
      Action::SendToRectify => {
        let p: ObservationsPayload = parse(payload)?;
        m.send_to_rectify(ctx, &p.observaciones)
      }
      Action::SetFileNumber => {
        let p: NumberPayload = parse(payload)?;
        m.set_file_number(ctx, &p.numero)
      }
      Action::RecordConvenioSigned => {
        let p: ConvenioSignedPayload = parse(payload)?;
        m.record_convenio_signed(ctx, &p.numero, p.archivo.map(Upload::from))
      }
      Action::SaveConvenioFormulary => {
        let p: FormularyPayload = parse(payload)?;
        m.save_formulary(ctx, FormularyKind::ConvenioProject, p)
      }
      Action::SaveDispositionFormulary => {
        let p: FormularyPayload = parse(payload)?;
        m.save_formulary(ctx, FormularyKind::DispositionProject, p)
      }
      Action::SetTechnicalIfNumber => {
        let p: NumberPayload = parse(payload)?;
        m.set_technical_if_number(ctx, &p.numero)
      }
      Action::RecordDisposition => {
        let p: NumberPayload = parse(payload)?;
        m.record_disposition(ctx, &p.numero)
      }
      Action::ValidateLegal => {
        let p: ValidationPayload = parse(payload)?;
        let intervention: LegalIntervention = choice(&p.intervencion, "Tipo de intervención")?;
        let motive = match p.motivo.as_deref() {
          Some(m) if !m.trim().is_empty() => Some(choice::<RejectionMotive>(m, "Motivo de rechazo")?),
          _ => None,
        };
        let detail = match p.detalle.as_deref() {
          Some(d) if !d.trim().is_empty() => Some(choice::<DictamenDetail>(d, "Detalle de dictamen")?),
          _ => None,
        };
        m.validate_legal(ctx, intervention, motive, detail)
      }
      Action::SolicitComplementary => {
        let p: ObservationsPayload = parse(payload)?;
        m.solicit_complementary(ctx, &p.observaciones)
      }
      Action::RecordSgaReport => m.record_sga_report(ctx),
      Action::SetConvenioIfNumber => {
        let p: NumberPayload = parse(payload)?;
        m.set_formulary_if_number(ctx, FormularyKind::ConvenioProject, &p.numero)
      }
      Action::SetDispositionIfNumber => {
        let p: NumberPayload = parse(payload)?;
        m.set_formulary_if_number(ctx, FormularyKind::DispositionProject, &p.numero)
      }
      Action::ResetDictamenFlow => m.reset_dictamen_flow(ctx),
      Action::MarkDocumentationRectified => m.mark_documentation_rectified(ctx),
      Action::CreateCustomDocument => {
        let p: CustomDocumentPayload = parse(payload)?;
        m.create_custom(ctx, &p.nombre, p.archivo.map(Upload::from))
      }
      Action::SetLegalIf => {
        let p: NumberPayload = parse(payload)?;
        m.set_legal_if(ctx, &p.numero)
      }
      Action::ForceClose => {
        let p: ForceClosePayload = parse(payload)?;
        m.force_close(ctx, &p.motivo)
      }
      Action::UploadEditedDocx => {
        let p: UploadPayload = parse(payload)?;
        m.upload_edited_docx(ctx, p.into())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn validation_payload_accepts_labels() -> Result<(), WorkflowError> {
    let p: ValidationPayload = parse(json!({ "intervencion": "Rechazado", "motivo": "dictamen",
                                             "detalle": "observacion en proyecto de convenio" }))?;
    let i: LegalIntervention = choice(&p.intervencion, "intervención")?;
    assert_eq!(i, LegalIntervention::Rejected);
    let d: DictamenDetail = choice(p.detalle.as_deref().unwrap_or_default(), "detalle")?;
    assert_eq!(d, DictamenDetail::ObservacionProyectoConvenio);
    Ok(())
  }

  #[test]
  fn malformed_payload_is_a_validation_failure() {
    let r: Result<UploadPayload, _> = parse(json!({ "contenido": "x" }));
    assert!(matches!(r, Err(WorkflowError::ValidationFailure(_))));
  }
}
