use crate::errors::WorkflowError;
use admisiones_domain::{AdmissionRecord, AdmissionType, ArtifactRefs, ConvenioType, FormularyKind, KitchenRef};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// Artefactos que genera el motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  TechnicalReportDraft,
  TechnicalReportFinal,
  ConvenioProject,
  DispositionProject,
}

impl ArtifactKind {
  pub fn code(&self) -> &'static str {
    match self {
      ArtifactKind::TechnicalReportDraft => "informe_tecnico_borrador",
      ArtifactKind::TechnicalReportFinal => "informe_tecnico",
      ArtifactKind::ConvenioProject => "proyecto_convenio",
      ArtifactKind::DispositionProject => "proyecto_disposicion",
    }
  }

  pub fn for_formulary(kind: FormularyKind) -> Self {
    match kind {
      FormularyKind::ConvenioProject => ArtifactKind::ConvenioProject,
      FormularyKind::DispositionProject => ArtifactKind::DispositionProject,
    }
  }
}

impl fmt::Display for ArtifactKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.code())
  }
}

/// Pedido de generación: `(admisión, tipo)`, plantilla y contexto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRequest {
  pub admission_id: Uuid,
  pub kind: ArtifactKind,
  pub template: String,
  pub context: JsonValue,
}

/// Colaborador externo que renderiza PDF + documento editable.
pub trait ArtifactGenerator: Send + Sync {
  fn generate(&self, request: &ArtifactRequest) -> Result<ArtifactRefs, WorkflowError>;
}

fn convenio_family(convenio: &ConvenioType) -> &'static str {
  if convenio.eclesiastica {
    "eclesiastica"
  } else if convenio.code.starts_with("base") {
    "base"
  } else {
    "juridica"
  }
}

fn admission_type_slug(t: AdmissionType) -> &'static str {
  match t {
    AdmissionType::Incorporation => "incorporacion",
    AdmissionType::Renewal => "renovacion",
  }
}

/// Selector de plantilla.
pub fn template_for(kind: ArtifactKind, convenio: &ConvenioType, admission_type: AdmissionType) -> String {
  match kind {
    ArtifactKind::TechnicalReportDraft => {
      format!("informe_tecnico_{}_{}_borrador", convenio_family(convenio), admission_type_slug(admission_type))
    }
    ArtifactKind::TechnicalReportFinal => {
      format!("informe_tecnico_{}_{}", convenio_family(convenio), admission_type_slug(admission_type))
    }
    ArtifactKind::ConvenioProject => format!("proyecto_convenio_{}", convenio_family(convenio)),
    ArtifactKind::DispositionProject => format!("proyecto_disposicion_{}", admission_type_slug(admission_type)),
  }
}

/// Contexto de la plantilla: comedor, admisión y datos del formulario o
/// informe según el tipo.
pub fn build_request(kind: ArtifactKind,
                     record: &AdmissionRecord,
                     convenio: &ConvenioType,
                     kitchen: Option<&KitchenRef>)
                     -> Result<ArtifactRequest, WorkflowError> {
  let a = &record.admission;
  let data = match kind {
    ArtifactKind::TechnicalReportDraft | ArtifactKind::TechnicalReportFinal => {
      let report = record.technical_report
                         .as_ref()
                         .ok_or_else(|| WorkflowError::ArtifactGenerationFailure("informe técnico inexistente".into()))?;
      json!({ "estado": report.state(), "campos": report.snapshot() })
    }
    ArtifactKind::ConvenioProject | ArtifactKind::DispositionProject => {
      let fk = match kind {
        ArtifactKind::ConvenioProject => FormularyKind::ConvenioProject,
        _ => FormularyKind::DispositionProject,
      };
      let f = record.formulary(fk)
                    .ok_or_else(|| WorkflowError::ArtifactGenerationFailure(format!("formulario {:?} inexistente", fk)))?;
      serde_json::to_value(&f.payload)?
    }
  };
  let context = json!({
    "comedor": kitchen,
    "convenio": { "codigo": convenio.code, "nombre": convenio.name },
    "admision": {
      "id": a.id,
      "tipo": a.admission_type,
      "numero_expediente": a.file_number,
      "numero_if_legales": a.legal_if_number,
      "numero_if_tecnico": a.technical_if_number
    },
    "datos": data
  });
  Ok(ArtifactRequest { admission_id: a.id,
                       kind,
                       template: template_for(kind, convenio, a.admission_type),
                       context })
}

/// Ejecuta el generador en un hilo propio y espera como máximo `timeout`.
/// Un resultado sin PDF o sin DOCX también es un fallo.
pub fn generate_with_timeout(generator: Arc<dyn ArtifactGenerator>,
                             request: ArtifactRequest,
                             timeout: Duration)
                             -> Result<ArtifactRefs, WorkflowError> {
  let (tx, rx) = mpsc::channel();
  let kind = request.kind;
  thread::Builder::new().name(format!("artefacto-{}", kind))
                        .spawn(move || {
                          let _ = tx.send(generator.generate(&request));
                        })
                        .map_err(|e| WorkflowError::ArtifactGenerationFailure(e.to_string()))?;
  match rx.recv_timeout(timeout) {
    Ok(Ok(refs)) if refs.is_complete() => Ok(refs),
    Ok(Ok(_)) => Err(WorkflowError::ArtifactGenerationFailure(format!("{}: artefacto incompleto", kind))),
    Ok(Err(WorkflowError::ArtifactGenerationFailure(msg))) => Err(WorkflowError::ArtifactGenerationFailure(msg)),
    Ok(Err(other)) => Err(WorkflowError::ArtifactGenerationFailure(other.to_string())),
    Err(RecvTimeoutError::Timeout) => {
      Err(WorkflowError::ArtifactGenerationFailure(format!("{}: tiempo agotado tras {:?}", kind, timeout)))
    }
    Err(RecvTimeoutError::Disconnected) => {
      Err(WorkflowError::ArtifactGenerationFailure(format!("{}: el generador terminó sin respuesta", kind)))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn templates_follow_convenio_and_type() -> Result<(), admisiones_domain::DomainError> {
    let ecl = ConvenioType::new("personeria_juridica_eclesiastica", "Eclesiástica", true)?;
    let base = ConvenioType::new("base_juridica", "Base", false)?;
    assert_eq!(template_for(ArtifactKind::TechnicalReportFinal, &ecl, AdmissionType::Incorporation),
               "informe_tecnico_eclesiastica_incorporacion");
    assert_eq!(template_for(ArtifactKind::ConvenioProject, &base, AdmissionType::Renewal),
               "proyecto_convenio_base");
    assert_eq!(template_for(ArtifactKind::DispositionProject, &base, AdmissionType::Renewal),
               "proyecto_disposicion_renovacion");
    Ok(())
  }
}
