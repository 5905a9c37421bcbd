mod common;

use admisiones_domain::{AdmissionState, DocumentStatus, ReportState, ReviewDecision, SaveAction};
use admisiones_workflow::{Action, ArtifactKind, Upload, WorkflowError};
use common::*;
use historial::HistoryKind;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

#[test]
fn unknown_key_is_denied() {
  let wf = workflow();
  let id = new_admission(&wf);
  let err = dispatch(&wf, "btnBorrarTodo", id, coordinator(), json!({})).expect_err("unknown");
  assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
}

#[test]
fn role_matrix_is_enforced_before_the_operation() {
  let wf = workflow();
  let id = new_admission(&wf);
  to_formularies_loaded(&wf, id);

  let err = dispatch(&wf, "ValidacionJuridicos", id, technician(), json!({ "intervencion": "validado" }))
    .expect_err("technician");
  assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
  let err = dispatch(&wf, "forzar_cierre", id, lawyer(), json!({ "motivo": "x" })).expect_err("lawyer");
  assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));

  let out = dispatch(&wf, "ValidacionJuridicos", id, lawyer(), json!({ "intervencion": "validado" })).expect("lawyer");
  assert!(out.available_actions.contains(&Action::RecordSgaReport));
}

#[test]
fn custom_document_roles_follow_the_stage() {
  let wf = workflow();
  let id = new_admission(&wf);
  let payload = json!({ "nombre": "Nota de la parroquia" });

  // en convention_selected nadie puede
  for actor in [technician(), lawyer(), coordinator()] {
    let err = dispatch(&wf, "btnDocumentoExpediente", id, actor, payload.clone()).expect_err("denied");
    assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
  }

  upload_mandatory(&wf, id);
  dispatch(&wf, "btnDocumentoExpediente", id, technician(), payload.clone()).expect("technician");
  assert!(dispatch(&wf, "btnDocumentoExpediente", id, lawyer(), json!({ "nombre": "Otra" })).is_err());

  let slots = wf.machine.documents(&id).expect("documents");
  assert!(slots.iter().any(|s| s.catalog.is_none() && s.document.as_ref().map(|d| d.name.as_str()) == Some("Nota de la parroquia")));
}

#[test]
fn action_roles_are_checked_inside_the_operation() {
  let wf = workflow();
  let id = new_admission(&wf);
  let before = wf.machine.get(&id).expect("record").version;

  let c = ctx(id, technician()).via(Action::CreateCustomDocument);
  let err = wf.machine.create_custom(&c, "Nota de la parroquia", None).expect_err("denied");
  assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
  assert_eq!(wf.machine.get(&id).expect("record").version, before);

  upload_mandatory(&wf, id);
  wf.machine.create_custom(&c, "Nota de la parroquia", None).expect("technician");

  to_sent_to_legal(&wf, id);
  let err = wf.machine.create_custom(&c, "Nota tardía", None).expect_err("legal stage");
  assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
  wf.machine
    .create_custom(&ctx(id, lawyer()).via(Action::CreateCustomDocument), "Nota tardía", None)
    .expect("lawyer");
}

#[test]
fn malformed_payload_is_a_validation_failure() {
  let wf = workflow();
  let id = new_admission(&wf);
  to_formularies_loaded(&wf, id);
  let err = dispatch(&wf, "ValidacionJuridicos", id, lawyer(), json!({ "intervencion": "quizas" })).expect_err("bad");
  assert!(matches!(err, WorkflowError::ValidationFailure(_)));
  let err = dispatch(&wf, "ValidacionJuridicos", id, lawyer(), json!({ "intervencion": "rechazado" }))
    .expect_err("motive missing");
  assert!(matches!(err, WorkflowError::ValidationFailure(_)));
}

#[test]
fn replayed_command_is_a_no_op() {
  let wf = workflow();
  let id = new_admission(&wf);
  upload_mandatory(&wf, id);
  let command = Uuid::new_v4();
  let c = ctx(id, technician()).with_command(command);

  let first = wf.machine.create_custom(&c, "Nota de presentación", None).expect("first");
  assert!(!first.replayed);
  let entries = wf.machine.history(&id).expect("history").len();

  let second = wf.machine.create_custom(&c, "Nota de presentación", None).expect("replay");
  assert!(second.replayed);
  assert_eq!(second.version, first.version);
  assert_eq!(wf.machine.history(&id).expect("history").len(), entries);
}

#[test]
fn artifact_failure_commits_with_warning_and_can_be_retried() {
  let wf = workflow();
  let id = new_admission(&wf);
  to_documentation_approved(&wf, id);
  wf.machine.save_report(&ctx(id, technician()), report_payload(), SaveAction::Submit).expect("submit");

  wf.artifacts.set_failing(true);
  let out = wf.machine
              .review_report(&ctx(id, coordinator()), ReviewDecision::Validated, &[], None)
              .expect("validated despite failure");
  assert_eq!(out.admission.admission_state, AdmissionState::TechnicalReportFinalized);
  assert_eq!(out.warnings.len(), 1);
  let record = wf.machine.get(&id).expect("record");
  assert!(!record.technical_report.as_ref().expect("report").final_artifacts().is_complete());
  let warnings = wf.machine
                   .history(&id)
                   .expect("history")
                   .into_iter()
                   .filter(|e| e.kind() == HistoryKind::ArtifactWarning)
                   .count();
  assert_eq!(warnings, 1);

  wf.artifacts.set_failing(false);
  let out = wf.machine.retry_artifacts(&ctx(id, coordinator()), ArtifactKind::TechnicalReportFinal).expect("retry");
  assert!(out.warnings.is_empty());
  let record = wf.machine.get(&id).expect("record");
  assert!(record.technical_report.as_ref().expect("report").final_artifacts().is_complete());

  let err = wf.machine
              .retry_artifacts(&ctx(id, coordinator()), ArtifactKind::TechnicalReportFinal)
              .expect_err("nothing to retry");
  assert_eq!(err.reason(), Some("artifacts_present"));
}

#[test]
fn slow_generator_times_out_without_blocking_the_transition() {
  let wf = workflow();
  let id = new_admission(&wf);
  to_documentation_approved(&wf, id);
  wf.artifacts.set_delay(Duration::from_millis(1500));
  let out = wf.machine
              .save_report(&ctx(id, technician()), report_payload(), SaveAction::Submit)
              .expect("submit");
  assert_eq!(out.warnings.len(), 1);
  assert_eq!(out.admission.admission_state, AdmissionState::TechnicalReportDrafted);
}

#[test]
fn edited_docx_completes_the_technical_stage() {
  let wf = workflow();
  let id = new_admission(&wf);
  to_report_finalized(&wf, id);

  let out = dispatch(&wf, "btnIFInformeTecnico", id, technician(), json!({ "numero": "IF-TEC-44" })).expect("IF");
  assert_eq!(out.admission.admission_state, AdmissionState::TechnicalReportDocxGenerated);
  assert_eq!(out.admission.technical_if_number.as_deref(), Some("IF-TEC-44"));

  let out = dispatch(&wf,
                     "subir_docx_final",
                     id,
                     technician(),
                     json!({ "nombre": "informe.docx", "contenido": "editado" })).expect("docx");
  assert_eq!(out.admission.admission_state, AdmissionState::TechnicalReportDocxEdited);
  let record = wf.machine.get(&id).expect("record");
  let report = record.technical_report.as_ref().expect("report");
  assert_eq!(report.state(), ReportState::DocxEdited);
  assert!(report.edited_docx().is_some());

  let out = dispatch(&wf, "mandarLegales", id, coordinator(), json!({})).expect("send");
  assert_eq!(out.admission.admission_state, AdmissionState::SentToLegal);
}

#[test]
fn rectify_document_blocks_deletion() {
  let wf = workflow();
  let id = new_admission(&wf);
  upload_mandatory(&wf, id);
  let (catalog_id, _) = mandatory_entries(&wf, id).remove(0);
  let doc = document_id(&wf, id, catalog_id);

  let err = wf.machine
              .set_document_status(&ctx(id, technician()), doc, DocumentStatus::ToRectify, None)
              .expect_err("observations");
  assert!(matches!(err, WorkflowError::ValidationFailure(_)));
  wf.machine
    .set_document_status(&ctx(id, technician()), doc, DocumentStatus::ToRectify, Some("ilegible"))
    .expect("to rectify");
  let err = wf.machine.delete_document(&ctx(id, technician()), doc).expect_err("blocked");
  assert_eq!(err.reason(), Some("document_to_rectify"));

  wf.machine
    .upload_document(&ctx(id, technician()), catalog_id, Upload::new("estatuto.pdf", "nuevo"))
    .expect("re-upload");
  let files_before = wf.files.len().expect("files");
  wf.machine.delete_document(&ctx(id, technician()), doc).expect("delete");
  assert_eq!(wf.files.len().expect("files"), files_before - 1);
  assert!(wf.machine.get(&id).expect("record").document(&doc).is_none());
}

#[test]
fn technician_cannot_set_lawyer_status() {
  let wf = workflow();
  let id = new_admission(&wf);
  upload_mandatory(&wf, id);
  let (catalog_id, _) = mandatory_entries(&wf, id).remove(0);
  let doc = document_id(&wf, id, catalog_id);
  let err = wf.machine
              .set_document_status(&ctx(id, technician()), doc, DocumentStatus::ToValidateLawyer, None)
              .expect_err("denied");
  assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
}
