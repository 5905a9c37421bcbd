mod common;

use admisiones_domain::{AdmissionFilter, AdmissionRepository, AdmissionState, AdmissionType, Choice, DocumentStatus,
                        DomainStubs, FormularyKind, LegalIntervention, LegalState, SaveAction};
use admisiones_workflow::{Action, AdmissionStateMachine, AdmissionWorkflow, InMemoryFileStore, RecordingNotifier,
                          StateEvent, StubArtifactGenerator, Upload, WorkflowError};
use common::*;
use historial::{HistoryChange, HistoryEntry, HistoryError, HistoryMeta, HistoryRepository, PersistResult, StateAxis};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Recorrido completo hasta `finalized` en ambos ejes.
fn to_finalized(wf: &AdmissionWorkflow, id: Uuid) {
  to_formularies_loaded(wf, id);
  let legal = ctx(id, lawyer());
  wf.machine.validate_legal(&legal, LegalIntervention::Validated, None, None).expect("validate");
  dispatch(wf, "BtnInformeSGA", id, lawyer(), json!({})).expect("sga");
  dispatch(wf, "btnRESO", id, lawyer(), json!({ "numero": "RESO-2025-77" })).expect("disposition");
  dispatch(wf,
           "btnConvenio",
           id,
           lawyer(),
           json!({ "numero": "CONV-2025-9", "archivo": { "nombre": "convenio.pdf", "contenido": "firmado" } }))
    .expect("convenio");
  dispatch(wf, "btnDisponibilizarAcomp", id, legal_area(), json!({})).expect("available");
}

#[test]
fn history_replays_through_allowed_edges() {
  let wf = workflow();
  let id = new_admission(&wf);
  to_finalized(&wf, id);

  let record = wf.machine.get(&id).expect("record");
  assert_eq!(record.admission.admission_state, AdmissionState::Finalized);
  assert_eq!(record.admission.legal_state, Some(LegalState::Finalized));
  assert!(record.admission.sent_to_accompaniment);
  assert_eq!(record.admission.convenio_number.as_deref(), Some("CONV-2025-9"));
  assert!(record.admission.convenio_file.is_some());

  let mut admission: Option<AdmissionState> = None;
  let mut legal: Option<LegalState> = None;
  for entry in wf.machine.history(&id).expect("history") {
    if let HistoryChange::StateChange { axis, from, to, .. } = entry.change {
      match axis {
        StateAxis::Admission => {
          let to = AdmissionState::parse_choice(&to.code).expect("admission state");
          assert_eq!(from.map(|f| f.code), admission.map(|a| a.code().to_string()));
          if let Some(prev) = admission {
            assert!(prev.can_transition_to(to), "{:?} -> {:?}", prev, to);
          }
          admission = Some(to);
        }
        StateAxis::Legal => {
          let to = LegalState::parse_choice(&to.code).expect("legal state");
          assert_eq!(from.map(|f| f.code), legal.map(|l| l.code().to_string()));
          assert!(LegalState::can_transition(legal, to), "{:?} -> {:?}", legal, to);
          legal = Some(to);
        }
      }
    }
  }
  assert_eq!(admission, Some(record.admission.admission_state));
  assert_eq!(legal, record.admission.legal_state);

  let events = wf.notifier.events();
  assert!(events.contains(&StateEvent::SentToLegal));
  assert!(events.contains(&StateEvent::AvailableForAccompaniment));
  assert!(events.contains(&StateEvent::LegalFinalized));
}

#[test]
fn archived_admission_rejects_every_action() {
  let wf = workflow();
  let id = new_admission(&wf);
  to_sent_to_legal(&wf, id);
  wf.machine.force_close(&ctx(id, coordinator()), "baja del programa").expect("close");
  let version = wf.machine.get(&id).expect("record").version;

  for action in Action::ALL {
    let err = dispatch(&wf, action.key(), id, coordinator(), json!({})).expect_err("archived");
    assert!(matches!(err, WorkflowError::InvalidTransition { ref reason, .. } if reason == "admission_archived"),
            "{} -> {:?}",
            action,
            err);
  }
  assert!(wf.machine.force_close(&ctx(id, coordinator()), "otra vez").is_err());
  assert!(wf.machine.save_report(&ctx(id, technician()), report_payload(), SaveAction::Draft).is_err());
  assert!(wf.machine.create_custom(&ctx(id, technician()), "Nota", None).is_err());
  assert_eq!(wf.machine.get(&id).expect("record").version, version);
  assert!(wf.machine.available_actions(&id, &coordinator()).expect("actions").is_empty());
}

#[test]
fn force_close_emits_one_entry_from_any_state() {
  let stages: Vec<fn(&AdmissionWorkflow, Uuid)> = vec![|_, _| {},
                                                       upload_mandatory,
                                                       to_documentation_approved,
                                                       to_report_finalized,
                                                       to_sent_to_legal,
                                                       to_expediente,
                                                       to_finalized];
  for stage in stages {
    let wf = workflow();
    let id = new_admission(&wf);
    stage(&wf, id);
    let before = wf.machine.history(&id).expect("history").len();
    let out = wf.machine.force_close(&ctx(id, coordinator()), "cierre administrativo").expect("close");
    assert!(out.admission.archived);
    assert_eq!(out.admission.closure_reason.as_deref(), Some("cierre administrativo"));
    assert_eq!(wf.machine.history(&id).expect("history").len(), before + 1);
  }
}

#[test]
fn force_close_requires_reason() {
  let wf = workflow();
  let id = new_admission(&wf);
  let before = wf.machine.history(&id).expect("history").len();
  let err = dispatch(&wf, "forzar_cierre", id, coordinator(), json!({ "motivo": "  " })).expect_err("empty");
  assert!(matches!(err, WorkflowError::ValidationFailure(_)));
  assert!(!wf.machine.get(&id).expect("record").admission.archived);
  assert_eq!(wf.machine.history(&id).expect("history").len(), before);
}

#[test]
fn send_to_legal_needs_validated_report() {
  let wf = workflow();
  let id = new_admission(&wf);
  to_documentation_approved(&wf, id);

  let err = wf.machine.send_to_legal(&ctx(id, technician())).expect_err("no report");
  assert!(matches!(err, WorkflowError::InvalidTransition { ref reason, .. } if reason == "report_missing"));

  wf.machine.save_report(&ctx(id, technician()), report_payload(), SaveAction::Draft).expect("draft");
  let err = wf.machine.send_to_legal(&ctx(id, technician())).expect_err("draft report");
  assert!(matches!(err, WorkflowError::InvalidTransition { ref reason, .. } if reason == "report_not_validated"));
  assert!(!wf.machine.get(&id).expect("record").admission.sent_to_legal);
}

#[test]
fn repeating_a_document_status_is_a_no_op() {
  let wf = workflow();
  let id = new_admission(&wf);
  upload_mandatory(&wf, id);
  let (catalog_id, _) = mandatory_entries(&wf, id).remove(0);
  let doc = document_id(&wf, id, catalog_id);

  let first = wf.machine
                .set_document_status(&ctx(id, lawyer()), doc, DocumentStatus::Accepted, None)
                .expect("first");
  let entries = wf.machine.history(&id).expect("history").len();
  let second = wf.machine
                 .set_document_status(&ctx(id, lawyer()), doc, DocumentStatus::Accepted, None)
                 .expect("second");
  assert_eq!(first.version, second.version);
  assert_eq!(wf.machine.history(&id).expect("history").len(), entries);
}

#[test]
fn convenio_round_trip_leaves_no_documents() {
  let wf = workflow();
  let id = new_admission(&wf);
  let (catalog_id, name) = mandatory_entries(&wf, id).remove(0);
  wf.machine
    .upload_document(&ctx(id, technician()), catalog_id, Upload::new(&name, "contenido"))
    .expect("upload");
  assert!(!wf.files.is_empty().expect("files"));

  let tech = ctx(id, technician());
  wf.machine.select_convenio(&tech, wf.sample.base_id).expect("base");
  wf.machine.select_convenio(&tech, wf.sample.eclesiastica_id).expect("back");

  let record = wf.machine.get(&id).expect("record");
  assert!(record.documents.is_empty());
  assert_eq!(record.admission.convenio_type_id, wf.sample.eclesiastica_id);
  assert!(wf.files.is_empty().expect("files"));
  let convenio_changes = wf.machine
                           .history(&id)
                           .expect("history")
                           .into_iter()
                           .filter(|e| matches!(&e.change, HistoryChange::FieldChange { field, .. } if field == "convenio"))
                           .count();
  assert_eq!(convenio_changes, 2);
}

#[test]
fn convenio_cannot_change_after_documentation_finalized() {
  let wf = workflow();
  let id = new_admission(&wf);
  upload_mandatory(&wf, id);
  assert_eq!(wf.machine.get(&id).expect("record").admission.admission_state,
             AdmissionState::DocumentationFinalized);
  let err = wf.machine.select_convenio(&ctx(id, technician()), wf.sample.base_id).expect_err("locked");
  assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
}

#[test]
fn no_corresponde_only_for_eclesiastica() {
  let mut payload = formulary_payload();
  payload.expiry = admisiones_domain::Expiry::NoCorresponde;

  let wf = workflow();
  let ecl = new_admission(&wf);
  to_expediente(&wf, ecl);
  wf.machine
    .save_formulary(&ctx(ecl, lawyer()), FormularyKind::ConvenioProject, payload.clone())
    .expect("eclesiastica accepts");

  let per = new_admission_with(&wf, wf.sample.personeria_id, admisiones_domain::AdmissionType::Incorporation);
  to_expediente(&wf, per);
  let err = wf.machine
              .save_formulary(&ctx(per, lawyer()), FormularyKind::ConvenioProject, payload)
              .expect_err("personeria rejects");
  assert!(matches!(err, WorkflowError::ValidationFailure(_)));
  assert!(wf.machine.get(&per).expect("record").convenio_formulary.is_none());
}

#[test]
fn rectification_round_trip_returns_to_legal() {
  let wf = workflow();
  let id = new_admission(&wf);
  to_sent_to_legal(&wf, id);

  let out = dispatch(&wf, "btnRectificarDocumentacion", id, lawyer(), json!({ "observaciones": "estatuto vencido" }))
    .expect("rectify");
  assert_eq!(out.admission.admission_state, AdmissionState::DocumentationInProgress);
  assert_eq!(out.admission.legal_state, Some(LegalState::ToRectify));
  assert_eq!(out.admission.rectification_observations.as_deref(), Some("estatuto vencido"));

  let out = dispatch(&wf, "btnObservaciones", id, technician(), json!({})).expect("rectified");
  assert_eq!(out.admission.legal_state, Some(LegalState::Rectified));
  assert_eq!(out.admission.admission_state, AdmissionState::SentToLegal);
  assert!(out.admission.rectification_observations.is_none());
}

#[test]
fn stale_version_is_a_conflict() {
  let wf = workflow();
  let id = new_admission(&wf);
  let stale = ctx(id, technician()).expecting(0);
  wf.machine.create_custom(&ctx(id, technician()), "Nota de presentación", None).expect("custom");
  let err = wf.machine.create_custom(&stale, "Otra nota", None).expect_err("stale");
  assert!(err.is_retryable());
}

/// Historial cuyo almacenamiento no responde.
struct UnavailableHistory;

impl UnavailableHistory {
  fn down() -> HistoryError {
    HistoryError::Storage("historial no disponible".to_string())
  }
}

impl HistoryRepository for UnavailableHistory {
  fn open(&self, _admission_id: &Uuid) -> historial::Result<HistoryMeta> {
    Err(Self::down())
  }

  fn get_meta(&self, _admission_id: &Uuid) -> historial::Result<HistoryMeta> {
    Err(Self::down())
  }

  fn persist_entries(&self, _admission_id: &Uuid, _entries: &[HistoryEntry], _expected_version: i64)
                     -> historial::Result<PersistResult> {
    Err(Self::down())
  }

  fn read_entries(&self, _admission_id: &Uuid, _from_cursor: i64) -> historial::Result<Vec<HistoryEntry>> {
    Err(Self::down())
  }

  fn contains_command(&self, _admission_id: &Uuid, _command_id: &Uuid) -> historial::Result<bool> {
    Err(Self::down())
  }

  fn count_entries(&self, _admission_id: &Uuid) -> historial::Result<i64> {
    Err(Self::down())
  }
}

#[test]
fn creation_without_history_leaves_no_admission() {
  let sample = DomainStubs::sample().expect("sample");
  let repo: Arc<dyn AdmissionRepository> = sample.repo.clone();
  let machine = AdmissionStateMachine::new(repo,
                                           Arc::new(UnavailableHistory),
                                           Arc::new(InMemoryFileStore::new()),
                                           Arc::new(StubArtifactGenerator::new()),
                                           Arc::new(RecordingNotifier::new()),
                                           config());
  let err = machine.create_admission(sample.kitchen_id,
                                     sample.eclesiastica_id,
                                     AdmissionType::Incorporation,
                                     &technician(),
                                     None)
                   .expect_err("history down");
  assert!(matches!(err, WorkflowError::History(_)));
  assert!(machine.list(&AdmissionFilter::default()).expect("list").is_empty());
}
