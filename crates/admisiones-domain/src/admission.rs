// admission.rs
use crate::choice::Choice;
use crate::document::FileHandle;
use crate::formulary::FormularyKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tipo de admisión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionType {
  Incorporation,
  Renewal,
}

impl Choice for AdmissionType {
  const ALL: &'static [Self] = &[AdmissionType::Incorporation, AdmissionType::Renewal];

  fn code(&self) -> &'static str {
    match self {
      AdmissionType::Incorporation => "incorporation",
      AdmissionType::Renewal => "renewal",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      AdmissionType::Incorporation => "Incorporación",
      AdmissionType::Renewal => "Renovación",
    }
  }
}

/// Ciclo de vida administrativo (`admission_state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionState {
  ConventionSelected,
  DocumentationInProgress,
  DocumentationFinalized,
  DocumentationApproved,
  TechnicalReportDrafted,
  TechnicalReportFinalized,
  TechnicalReportDocxGenerated,
  TechnicalReportDocxEdited,
  SentToLegal,
  Finalized,
  Archived,
}

impl Choice for AdmissionState {
  const ALL: &'static [Self] = &[AdmissionState::ConventionSelected,
                                 AdmissionState::DocumentationInProgress,
                                 AdmissionState::DocumentationFinalized,
                                 AdmissionState::DocumentationApproved,
                                 AdmissionState::TechnicalReportDrafted,
                                 AdmissionState::TechnicalReportFinalized,
                                 AdmissionState::TechnicalReportDocxGenerated,
                                 AdmissionState::TechnicalReportDocxEdited,
                                 AdmissionState::SentToLegal,
                                 AdmissionState::Finalized,
                                 AdmissionState::Archived];

  fn code(&self) -> &'static str {
    match self {
      AdmissionState::ConventionSelected => "convention_selected",
      AdmissionState::DocumentationInProgress => "documentation_in_progress",
      AdmissionState::DocumentationFinalized => "documentation_finalized",
      AdmissionState::DocumentationApproved => "documentation_approved",
      AdmissionState::TechnicalReportDrafted => "technical_report_drafted",
      AdmissionState::TechnicalReportFinalized => "technical_report_finalized",
      AdmissionState::TechnicalReportDocxGenerated => "technical_report_docx_generated",
      AdmissionState::TechnicalReportDocxEdited => "technical_report_docx_edited",
      AdmissionState::SentToLegal => "sent_to_legal",
      AdmissionState::Finalized => "finalized",
      AdmissionState::Archived => "archived",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      AdmissionState::ConventionSelected => "Convenio seleccionado",
      AdmissionState::DocumentationInProgress => "Documentación en proceso",
      AdmissionState::DocumentationFinalized => "Documentación finalizada",
      AdmissionState::DocumentationApproved => "Documentación aprobada",
      AdmissionState::TechnicalReportDrafted => "Informe técnico en borrador",
      AdmissionState::TechnicalReportFinalized => "Informe técnico finalizado",
      AdmissionState::TechnicalReportDocxGenerated => "Informe técnico DOCX generado",
      AdmissionState::TechnicalReportDocxEdited => "Informe técnico DOCX editado",
      AdmissionState::SentToLegal => "Enviado a legales",
      AdmissionState::Finalized => "Finalizada",
      AdmissionState::Archived => "Archivada",
    }
  }
}

impl AdmissionState {
  /// Posición en la secuencia principal. `Archived` queda fuera de la
  /// secuencia.
  pub fn rank(&self) -> Option<u8> {
    match self {
      AdmissionState::Archived => None,
      other => AdmissionState::ALL.iter().position(|s| s == other).map(|p| p as u8),
    }
  }

  /// Verdadero si `self` está estrictamente después de `other` en la
  /// secuencia principal.
  pub fn is_past(&self, other: AdmissionState) -> bool {
    matches!((self.rank(), other.rank()), (Some(a), Some(b)) if a > b)
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, AdmissionState::Finalized | AdmissionState::Archived)
  }

  /// Aristas permitidas de `admission_state`. Las aristas hacia
  /// `documentation_in_progress` son las de rectificación; `archived` sólo se
  /// alcanza por cierre forzado desde cualquier estado no archivado.
  pub fn can_transition_to(&self, next: AdmissionState) -> bool {
    use AdmissionState::*;
    if next == Archived {
      return *self != Archived;
    }
    matches!((self, next),
             (ConventionSelected, DocumentationInProgress)
             | (DocumentationInProgress, DocumentationFinalized)
             | (DocumentationFinalized, DocumentationApproved)
             | (DocumentationApproved, TechnicalReportDrafted)
             | (TechnicalReportDrafted, TechnicalReportFinalized)
             | (TechnicalReportFinalized, TechnicalReportDocxGenerated)
             | (TechnicalReportDocxGenerated, TechnicalReportDocxEdited)
             | (TechnicalReportFinalized, SentToLegal)
             | (TechnicalReportDocxGenerated, SentToLegal)
             | (TechnicalReportDocxEdited, SentToLegal)
             | (SentToLegal, Finalized)
             | (DocumentationFinalized, DocumentationInProgress)
             | (DocumentationApproved, DocumentationInProgress)
             | (TechnicalReportDrafted, DocumentationInProgress)
             | (TechnicalReportFinalized, DocumentationInProgress)
             | (TechnicalReportDocxGenerated, DocumentationInProgress)
             | (TechnicalReportDocxEdited, DocumentationInProgress)
             | (SentToLegal, DocumentationInProgress))
  }
}

/// Eje legal (`legal_state`), activo desde el envío a legales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalState {
  EnviadoLegales,
  ToRectify,
  Rectified,
  LegalIfAssigned,
  ExpedienteAdded,
  ConvenioFormularyLoaded,
  DispositionFormularyLoaded,
  JuridicosValidated,
  JuridicosRejected,
  SgaReportGenerated,
  DispositionGenerated,
  ConvenioSigned,
  Finalized,
}

impl Choice for LegalState {
  const ALL: &'static [Self] = &[LegalState::EnviadoLegales,
                                 LegalState::ToRectify,
                                 LegalState::Rectified,
                                 LegalState::LegalIfAssigned,
                                 LegalState::ExpedienteAdded,
                                 LegalState::ConvenioFormularyLoaded,
                                 LegalState::DispositionFormularyLoaded,
                                 LegalState::JuridicosValidated,
                                 LegalState::JuridicosRejected,
                                 LegalState::SgaReportGenerated,
                                 LegalState::DispositionGenerated,
                                 LegalState::ConvenioSigned,
                                 LegalState::Finalized];

  fn code(&self) -> &'static str {
    match self {
      LegalState::EnviadoLegales => "enviado_legales",
      LegalState::ToRectify => "to_rectify",
      LegalState::Rectified => "rectified",
      LegalState::LegalIfAssigned => "legal_if_assigned",
      LegalState::ExpedienteAdded => "expediente_added",
      LegalState::ConvenioFormularyLoaded => "convenio_formulary_loaded",
      LegalState::DispositionFormularyLoaded => "disposition_formulary_loaded",
      LegalState::JuridicosValidated => "juridicos_validated",
      LegalState::JuridicosRejected => "juridicos_rejected",
      LegalState::SgaReportGenerated => "sga_report_generated",
      LegalState::DispositionGenerated => "disposition_generated",
      LegalState::ConvenioSigned => "convenio_signed",
      LegalState::Finalized => "finalized",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      LegalState::EnviadoLegales => "Enviado a legales",
      LegalState::ToRectify => "A rectificar",
      LegalState::Rectified => "Rectificado",
      LegalState::LegalIfAssigned => "IF de legales asignado",
      LegalState::ExpedienteAdded => "Expediente agregado",
      LegalState::ConvenioFormularyLoaded => "Proyecto de convenio cargado",
      LegalState::DispositionFormularyLoaded => "Proyecto de disposición cargado",
      LegalState::JuridicosValidated => "Validado por jurídicos",
      LegalState::JuridicosRejected => "Rechazado por jurídicos",
      LegalState::SgaReportGenerated => "Informe SGA generado",
      LegalState::DispositionGenerated => "Disposición generada",
      LegalState::ConvenioSigned => "Convenio firmado",
      LegalState::Finalized => "Finalizado",
    }
  }
}

impl LegalState {
  /// Aristas permitidas del eje legal. `None -> enviado_legales` es la
  /// entrada al eje. Las regresiones desde `juridicos_rejected` corresponden
  /// al reinicio por dictamen.
  pub fn can_transition(from: Option<LegalState>, to: LegalState) -> bool {
    use LegalState::*;
    match from {
      None => to == EnviadoLegales,
      Some(from) => matches!((from, to),
                             (EnviadoLegales, ToRectify)
                             | (Rectified, ToRectify)
                             | (ToRectify, Rectified)
                             | (EnviadoLegales, LegalIfAssigned)
                             | (Rectified, LegalIfAssigned)
                             | (LegalIfAssigned, ExpedienteAdded)
                             | (ExpedienteAdded, ConvenioFormularyLoaded)
                             | (ConvenioFormularyLoaded, DispositionFormularyLoaded)
                             | (DispositionFormularyLoaded, ConvenioFormularyLoaded)
                             | (DispositionFormularyLoaded, JuridicosValidated)
                             | (DispositionFormularyLoaded, JuridicosRejected)
                             | (JuridicosRejected, JuridicosValidated)
                             | (JuridicosRejected, ExpedienteAdded)
                             | (JuridicosRejected, ConvenioFormularyLoaded)
                             | (JuridicosValidated, SgaReportGenerated)
                             | (SgaReportGenerated, DispositionGenerated)
                             | (DispositionGenerated, ConvenioSigned)
                             | (ConvenioSigned, Finalized)),
    }
  }

  /// Estados en los que todavía puede solicitarse un informe complementario.
  pub fn admits_complementary(&self) -> bool {
    use LegalState::*;
    matches!(self,
             EnviadoLegales
             | ToRectify
             | Rectified
             | LegalIfAssigned
             | ExpedienteAdded
             | ConvenioFormularyLoaded
             | DispositionFormularyLoaded
             | JuridicosRejected
             | JuridicosValidated)
  }
}

/// Resultado de la intervención de jurídicos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalIntervention {
  Validated,
  Rejected,
}

impl Choice for LegalIntervention {
  const ALL: &'static [Self] = &[LegalIntervention::Validated, LegalIntervention::Rejected];

  fn code(&self) -> &'static str {
    match self {
      LegalIntervention::Validated => "validado",
      LegalIntervention::Rejected => "rechazado",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      LegalIntervention::Validated => "Validado",
      LegalIntervention::Rejected => "Rechazado",
    }
  }
}

/// Motivo del rechazo de jurídicos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionMotive {
  Providencia,
  Dictamen,
}

impl Choice for RejectionMotive {
  const ALL: &'static [Self] = &[RejectionMotive::Providencia, RejectionMotive::Dictamen];

  fn code(&self) -> &'static str {
    match self {
      RejectionMotive::Providencia => "providencia",
      RejectionMotive::Dictamen => "dictamen",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      RejectionMotive::Providencia => "Providencia",
      RejectionMotive::Dictamen => "Dictamen",
    }
  }
}

/// Detalle del dictamen: indica qué proyecto debe rehacerse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictamenDetail {
  ObservacionProyectoConvenio,
  ObservacionProyectoDisposicion,
}

impl Choice for DictamenDetail {
  const ALL: &'static [Self] = &[DictamenDetail::ObservacionProyectoConvenio,
                                 DictamenDetail::ObservacionProyectoDisposicion];

  fn code(&self) -> &'static str {
    match self {
      DictamenDetail::ObservacionProyectoConvenio => "observacion_en_proyecto_de_convenio",
      DictamenDetail::ObservacionProyectoDisposicion => "observacion_en_proyecto_de_disposicion",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      DictamenDetail::ObservacionProyectoConvenio => "Observación en proyecto de convenio",
      DictamenDetail::ObservacionProyectoDisposicion => "Observación en proyecto de disposición",
    }
  }
}

impl DictamenDetail {
  /// Formulario afectado por el dictamen.
  pub fn target(&self) -> FormularyKind {
    match self {
      DictamenDetail::ObservacionProyectoConvenio => FormularyKind::ConvenioProject,
      DictamenDetail::ObservacionProyectoDisposicion => FormularyKind::DispositionProject,
    }
  }
}

/// Registro administrativo del ciclo de admisión de un comedor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admission {
  pub id: Uuid,
  pub kitchen_id: Uuid,
  pub convenio_type_id: Uuid,
  pub admission_type: AdmissionType,
  pub admission_state: AdmissionState,
  pub legal_state: Option<LegalState>,
  pub sent_to_legal: bool,
  pub sent_to_accompaniment: bool,
  pub archived: bool,
  pub sga_report_accepted: bool,
  pub complementary_requested: bool,
  pub file_number: Option<String>,
  pub legal_if_number: Option<String>,
  pub technical_if_number: Option<String>,
  pub convenio_number: Option<String>,
  pub convenio_file: Option<FileHandle>,
  pub disposition_number: Option<String>,
  pub rectification_observations: Option<String>,
  pub legal_intervention: Option<LegalIntervention>,
  pub rejection_motive: Option<RejectionMotive>,
  pub dictamen_detail: Option<DictamenDetail>,
  pub complementary_observations: Option<String>,
  pub closure_reason: Option<String>,
  pub created_by: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub state_changed_at: DateTime<Utc>,
}

impl Admission {
  /// Nueva admisión en `convention_selected`.
  pub fn new(kitchen_id: Uuid, convenio_type_id: Uuid, admission_type: AdmissionType, created_by: &str) -> Self {
    let now = Utc::now();
    Self { id: Uuid::new_v4(),
           kitchen_id,
           convenio_type_id,
           admission_type,
           admission_state: AdmissionState::ConventionSelected,
           legal_state: None,
           sent_to_legal: false,
           sent_to_accompaniment: false,
           archived: false,
           sga_report_accepted: false,
           complementary_requested: false,
           file_number: None,
           legal_if_number: None,
           technical_if_number: None,
           convenio_number: None,
           convenio_file: None,
           disposition_number: None,
           rectification_observations: None,
           legal_intervention: None,
           rejection_motive: None,
           dictamen_detail: None,
           complementary_observations: None,
           closure_reason: None,
           created_by: created_by.to_string(),
           created_at: now,
           updated_at: now,
           state_changed_at: now }
  }

  /// Una rectificación legal abierta bloquea la validación de jurídicos.
  pub fn has_open_rectification(&self) -> bool {
    self.legal_state == Some(LegalState::ToRectify)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn main_sequence_is_forward_only_except_rectify_edges() {
    use AdmissionState::*;
    assert!(ConventionSelected.can_transition_to(DocumentationInProgress));
    assert!(!DocumentationInProgress.can_transition_to(ConventionSelected));
    assert!(DocumentationApproved.can_transition_to(DocumentationInProgress));
    assert!(!Finalized.can_transition_to(SentToLegal));
    assert!(!DocumentationInProgress.can_transition_to(DocumentationApproved));
  }

  #[test]
  fn every_non_archived_state_can_be_archived() {
    for s in AdmissionState::ALL {
      assert_eq!(s.can_transition_to(AdmissionState::Archived), *s != AdmissionState::Archived);
    }
  }

  #[test]
  fn ranks_order_the_main_sequence() {
    assert!(AdmissionState::SentToLegal.is_past(AdmissionState::TechnicalReportDocxEdited));
    assert!(!AdmissionState::TechnicalReportDocxEdited.is_past(AdmissionState::TechnicalReportDocxEdited));
    assert!(!AdmissionState::Archived.is_past(AdmissionState::ConventionSelected));
  }

  #[test]
  fn legal_axis_starts_at_enviado_legales() {
    assert!(LegalState::can_transition(None, LegalState::EnviadoLegales));
    assert!(!LegalState::can_transition(None, LegalState::Rectified));
    assert!(LegalState::can_transition(Some(LegalState::JuridicosRejected), LegalState::ExpedienteAdded));
    assert!(!LegalState::can_transition(Some(LegalState::Finalized), LegalState::EnviadoLegales));
    assert!(LegalState::can_transition(Some(LegalState::DispositionFormularyLoaded),
                                       LegalState::ConvenioFormularyLoaded));
    assert!(!LegalState::can_transition(Some(LegalState::ExpedienteAdded), LegalState::DispositionFormularyLoaded));
  }

  #[test]
  fn dictamen_detail_parses_free_text() {
    let d = DictamenDetail::parse_choice("observacion en proyecto de convenio");
    assert_eq!(d, Some(DictamenDetail::ObservacionProyectoConvenio));
    assert_eq!(d.map(|d| d.target()), Some(FormularyKind::ConvenioProject));
  }
}
