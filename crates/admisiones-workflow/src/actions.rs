use admisiones_domain::{Actor, AdmissionRecord, AdmissionState, DictamenDetail, FormularyKind, LegalState,
                        RejectionMotive, ReportState, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Acciones que entiende el router; el nombre es la clave que envía la
/// interfaz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
  #[serde(rename = "mandarLegales")]
  SendToLegal,
  #[serde(rename = "btnDisponibilizarAcomp")]
  MakeAvailableToAccompaniment,
  #[serde(rename = "btnRectificarDocumentacion")]
  SendToRectify,
  #[serde(rename = "btnCaratulacion")]
  SetFileNumber,
  #[serde(rename = "btnConvenio")]
  RecordConvenioSigned,
  #[serde(rename = "btnDisposicion")]
  SaveDispositionFormulary,
  #[serde(rename = "btnIFInformeTecnico")]
  SetTechnicalIfNumber,
  #[serde(rename = "btnRESO")]
  RecordDisposition,
  #[serde(rename = "btnProyectoConvenio")]
  SaveConvenioFormulary,
  #[serde(rename = "ValidacionJuridicos")]
  ValidateLegal,
  #[serde(rename = "BtnIntervencionJuridicos")]
  SolicitComplementary,
  #[serde(rename = "BtnInformeSGA")]
  RecordSgaReport,
  #[serde(rename = "btnConvenioNumIF")]
  SetConvenioIfNumber,
  #[serde(rename = "btnDispoNumIF")]
  SetDispositionIfNumber,
  #[serde(rename = "btnReinicioExpediente")]
  ResetDictamenFlow,
  #[serde(rename = "btnObservaciones")]
  MarkDocumentationRectified,
  #[serde(rename = "btnDocumentoExpediente")]
  CreateCustomDocument,
  #[serde(rename = "btnLegalesNumIF")]
  SetLegalIf,
  #[serde(rename = "forzar_cierre")]
  ForceClose,
  #[serde(rename = "subir_docx_final")]
  UploadEditedDocx,
}

impl Action {
  pub const ALL: [Action; 20] = [Action::SendToLegal,
                                 Action::MakeAvailableToAccompaniment,
                                 Action::SendToRectify,
                                 Action::SetFileNumber,
                                 Action::RecordConvenioSigned,
                                 Action::SaveDispositionFormulary,
                                 Action::SetTechnicalIfNumber,
                                 Action::RecordDisposition,
                                 Action::SaveConvenioFormulary,
                                 Action::ValidateLegal,
                                 Action::SolicitComplementary,
                                 Action::RecordSgaReport,
                                 Action::SetConvenioIfNumber,
                                 Action::SetDispositionIfNumber,
                                 Action::ResetDictamenFlow,
                                 Action::MarkDocumentationRectified,
                                 Action::CreateCustomDocument,
                                 Action::SetLegalIf,
                                 Action::ForceClose,
                                 Action::UploadEditedDocx];

  /// Clave POST de la acción.
  pub fn key(&self) -> &'static str {
    match self {
      Action::SendToLegal => "mandarLegales",
      Action::MakeAvailableToAccompaniment => "btnDisponibilizarAcomp",
      Action::SendToRectify => "btnRectificarDocumentacion",
      Action::SetFileNumber => "btnCaratulacion",
      Action::RecordConvenioSigned => "btnConvenio",
      Action::SaveDispositionFormulary => "btnDisposicion",
      Action::SetTechnicalIfNumber => "btnIFInformeTecnico",
      Action::RecordDisposition => "btnRESO",
      Action::SaveConvenioFormulary => "btnProyectoConvenio",
      Action::ValidateLegal => "ValidacionJuridicos",
      Action::SolicitComplementary => "BtnIntervencionJuridicos",
      Action::RecordSgaReport => "BtnInformeSGA",
      Action::SetConvenioIfNumber => "btnConvenioNumIF",
      Action::SetDispositionIfNumber => "btnDispoNumIF",
      Action::ResetDictamenFlow => "btnReinicioExpediente",
      Action::MarkDocumentationRectified => "btnObservaciones",
      Action::CreateCustomDocument => "btnDocumentoExpediente",
      Action::SetLegalIf => "btnLegalesNumIF",
      Action::ForceClose => "forzar_cierre",
      Action::UploadEditedDocx => "subir_docx_final",
    }
  }

  /// Grupos autorizados para la acción en el estado actual de la admisión.
  /// Un par (acción, estado) sin entrada devuelve una lista vacía: se
  /// deniega.
  pub fn allowed_roles(&self, record: &AdmissionRecord) -> &'static [Role] {
    const TECH: &[Role] = &[Role::Technician, Role::DuplaTechnician];
    const TECH_COORD: &[Role] = &[Role::Technician, Role::DuplaTechnician, Role::Coordinator];
    const LEGAL: &[Role] = &[Role::DuplaLawyer, Role::LegalArea];
    const LEGAL_COORD: &[Role] = &[Role::LegalArea, Role::Coordinator];
    const COORD: &[Role] = &[Role::Coordinator];
    let a = &record.admission;
    match self {
      Action::SendToLegal => TECH_COORD,
      Action::SetTechnicalIfNumber => TECH_COORD,
      Action::UploadEditedDocx => TECH,
      Action::MarkDocumentationRectified => TECH,
      Action::MakeAvailableToAccompaniment => LEGAL_COORD,
      Action::ForceClose => COORD,
      Action::CreateCustomDocument if a.sent_to_legal => LEGAL,
      Action::CreateCustomDocument if a.admission_state != AdmissionState::ConventionSelected => TECH,
      Action::CreateCustomDocument => &[],
      Action::SendToRectify
      | Action::SetFileNumber
      | Action::RecordConvenioSigned
      | Action::SaveDispositionFormulary
      | Action::RecordDisposition
      | Action::SaveConvenioFormulary
      | Action::ValidateLegal
      | Action::SolicitComplementary
      | Action::RecordSgaReport
      | Action::SetConvenioIfNumber
      | Action::SetDispositionIfNumber
      | Action::ResetDictamenFlow
      | Action::SetLegalIf => LEGAL,
    }
  }

  pub fn permits(&self, actor: &Actor, record: &AdmissionRecord) -> bool {
    let roles = self.allowed_roles(record);
    !roles.is_empty() && actor.has_any(roles)
  }

  /// Indica si la acción tiene sentido en el estado actual. Es la lectura
  /// que usa la interfaz para mostrar botones; las precondiciones completas
  /// las verifica la máquina de estados.
  pub fn is_enabled(&self, record: &AdmissionRecord) -> bool {
    use LegalState::*;
    let a = &record.admission;
    if a.archived {
      return false;
    }
    let legal = a.legal_state;
    let report = record.technical_report.as_ref().map(|r| r.state());
    let dictamen_pending = legal == Some(JuridicosRejected) && a.rejection_motive == Some(RejectionMotive::Dictamen);
    let in_formularies = !dictamen_pending
                         && matches!(legal,
                                     Some(ExpedienteAdded)
                                     | Some(ConvenioFormularyLoaded)
                                     | Some(DispositionFormularyLoaded)
                                     | Some(JuridicosRejected));
    match self {
      Action::SendToLegal => {
        !a.sent_to_legal
        && matches!(a.admission_state,
                    AdmissionState::TechnicalReportFinalized
                    | AdmissionState::TechnicalReportDocxGenerated
                    | AdmissionState::TechnicalReportDocxEdited)
        && record.report_validated()
      }
      Action::MakeAvailableToAccompaniment => legal == Some(ConvenioSigned),
      Action::SendToRectify | Action::SetLegalIf => matches!(legal, Some(EnviadoLegales) | Some(Rectified)),
      Action::SetFileNumber => legal == Some(LegalIfAssigned),
      Action::RecordConvenioSigned => legal == Some(DispositionGenerated),
      Action::SaveConvenioFormulary => in_formularies,
      Action::SaveDispositionFormulary => in_formularies && record.convenio_formulary.is_some(),
      Action::SetTechnicalIfNumber => report == Some(ReportState::Validated),
      Action::RecordDisposition => legal == Some(SgaReportGenerated),
      Action::ValidateLegal => {
        !dictamen_pending && matches!(legal, Some(DispositionFormularyLoaded) | Some(JuridicosRejected))
      }
      Action::SolicitComplementary => {
        record.report_validated() && legal.map(|l| l.admits_complementary()).unwrap_or(false) && !a.complementary_requested
      }
      Action::RecordSgaReport => legal == Some(JuridicosValidated),
      Action::SetConvenioIfNumber => in_formularies && record.formulary(FormularyKind::ConvenioProject).is_some(),
      Action::SetDispositionIfNumber => in_formularies && record.formulary(FormularyKind::DispositionProject).is_some(),
      Action::ResetDictamenFlow => {
        legal == Some(JuridicosRejected)
        && a.rejection_motive == Some(RejectionMotive::Dictamen)
        && a.dictamen_detail.map(|d: DictamenDetail| record.formulary(d.target()).is_some()).unwrap_or(false)
      }
      Action::MarkDocumentationRectified => legal == Some(ToRectify),
      Action::CreateCustomDocument => !a.admission_state.is_terminal(),
      Action::ForceClose => true,
      Action::UploadEditedDocx => report == Some(ReportState::DocxGenerated),
    }
  }
}

/// Acciones habilitadas para el actor sobre la admisión.
pub fn available_actions(record: &AdmissionRecord, actor: &Actor) -> Vec<Action> {
  Action::ALL.iter().copied().filter(|a| a.is_enabled(record) && a.permits(actor, record)).collect()
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.key())
  }
}

impl FromStr for Action {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Action::ALL.iter().copied().find(|a| a.key() == s).ok_or_else(|| format!("acción desconocida '{}'", s))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use admisiones_domain::{Admission, AdmissionType};
  use uuid::Uuid;

  fn record() -> AdmissionRecord {
    AdmissionRecord::new(Admission::new(Uuid::new_v4(), Uuid::new_v4(), AdmissionType::Incorporation, "tec"))
  }

  #[test]
  fn keys_round_trip_through_from_str() {
    for a in Action::ALL {
      assert_eq!(a.key().parse::<Action>(), Ok(a));
    }
    assert!("btnInexistente".parse::<Action>().is_err());
  }

  #[test]
  fn serde_uses_post_keys() -> Result<(), serde_json::Error> {
    assert_eq!(serde_json::to_string(&Action::ForceClose)?, "\"forzar_cierre\"");
    Ok(())
  }

  #[test]
  fn unknown_pairs_are_denied() {
    let r = record();
    let tech = Actor::new("t", [Role::Technician]);
    assert!(!Action::CreateCustomDocument.permits(&tech, &r));
    assert!(!Action::ForceClose.permits(&tech, &r));
    assert!(Action::ForceClose.permits(&Actor::new("c", [Role::Coordinator]), &r));
  }

  #[test]
  fn new_admission_only_offers_force_close_to_coordinator() {
    let r = record();
    let coord = Actor::new("c", [Role::Coordinator]);
    assert_eq!(available_actions(&r, &coord), vec![Action::ForceClose]);
  }
}
