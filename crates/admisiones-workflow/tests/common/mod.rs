// Helpers compartidos por los tests de integración: actores, armado del
// motor y recorridos hasta estados intermedios.
#![allow(dead_code)]

use admisiones_domain::{Actor, AdmissionType, DocumentStatus, FormularyKind, FormularyPayload, ReviewDecision, Role,
                        SaveAction};
use admisiones_workflow::{ActionContext, AdmissionWorkflow, AdmissionWorkflowFactory, Upload, WorkflowConfig,
                          WorkflowError};
use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use uuid::Uuid;

pub fn technician() -> Actor {
  Actor::new("tecnico-1", [Role::Technician])
}

pub fn lawyer() -> Actor {
  Actor::new("abogado-1", [Role::DuplaLawyer])
}

pub fn coordinator() -> Actor {
  Actor::new("coordinador-1", [Role::Coordinator])
}

pub fn legal_area() -> Actor {
  Actor::new("legales-1", [Role::LegalArea])
}

pub fn config() -> WorkflowConfig {
  WorkflowConfig { artifact_timeout: Duration::from_millis(500),
                   catalog_ttl: Duration::from_secs(60) }
}

pub fn workflow() -> AdmissionWorkflow {
  AdmissionWorkflowFactory::with_config(config()).expect("factory")
}

pub fn ctx(id: Uuid, actor: Actor) -> ActionContext {
  ActionContext::new(id, actor)
}

/// Admisión nueva de incorporación con el convenio eclesiástico.
pub fn new_admission(wf: &AdmissionWorkflow) -> Uuid {
  new_admission_with(wf, wf.sample.eclesiastica_id, AdmissionType::Incorporation)
}

pub fn new_admission_with(wf: &AdmissionWorkflow, convenio: Uuid, admission_type: AdmissionType) -> Uuid {
  wf.machine
    .create_admission(wf.sample.kitchen_id, convenio, admission_type, &technician(), None)
    .expect("create admission")
    .admission
    .id
}

/// `(catalog_id, nombre)` de los documentos obligatorios del convenio.
pub fn mandatory_entries(wf: &AdmissionWorkflow, id: Uuid) -> Vec<(Uuid, String)> {
  wf.machine
    .documents(&id)
    .expect("documents")
    .into_iter()
    .filter_map(|slot| slot.catalog)
    .filter(|e| e.mandatory)
    .map(|e| (e.id, e.name))
    .collect()
}

pub fn document_id(wf: &AdmissionWorkflow, id: Uuid, catalog_id: Uuid) -> Uuid {
  wf.machine
    .get(&id)
    .expect("record")
    .document_for_catalog(&catalog_id)
    .expect("document")
    .id
}

pub fn upload_mandatory(wf: &AdmissionWorkflow, id: Uuid) {
  for (catalog_id, name) in mandatory_entries(wf, id) {
    wf.machine
      .upload_document(&ctx(id, technician()), catalog_id, Upload::new(&format!("{}.pdf", name), name.as_bytes()))
      .expect("upload");
  }
}

pub fn accept_mandatory(wf: &AdmissionWorkflow, id: Uuid) {
  for (catalog_id, _) in mandatory_entries(wf, id) {
    let doc = document_id(wf, id, catalog_id);
    wf.machine.set_document_status(&ctx(id, lawyer()), doc, DocumentStatus::Accepted, None).expect("accept");
  }
}

pub fn report_payload() -> IndexMap<String, JsonValue> {
  let mut p = IndexMap::new();
  p.insert("nombre_organizacion".to_string(), json!("Parroquia San José"));
  p.insert("responsable_tarjeta_dni".to_string(), json!("28999111"));
  p.insert("solicitudes_desayuno_lunes".to_string(), json!(40));
  p.insert("solicitudes_almuerzo_lunes".to_string(), json!(55));
  p
}

/// Hasta `documentation_approved`.
pub fn to_documentation_approved(wf: &AdmissionWorkflow, id: Uuid) {
  upload_mandatory(wf, id);
  accept_mandatory(wf, id);
}

/// Hasta `technical_report_finalized` con el informe validado.
pub fn to_report_finalized(wf: &AdmissionWorkflow, id: Uuid) {
  to_documentation_approved(wf, id);
  wf.machine.save_report(&ctx(id, technician()), report_payload(), SaveAction::Submit).expect("submit report");
  wf.machine
    .review_report(&ctx(id, coordinator()), ReviewDecision::Validated, &[], None)
    .expect("validate report");
}

pub fn dispatch(wf: &AdmissionWorkflow, key: &str, id: Uuid, actor: Actor, payload: JsonValue)
                -> Result<admisiones_workflow::TransitionOutcome, WorkflowError> {
  wf.router.dispatch(key, &ctx(id, actor), payload)
}

/// Hasta `enviado_legales`.
pub fn to_sent_to_legal(wf: &AdmissionWorkflow, id: Uuid) {
  to_report_finalized(wf, id);
  dispatch(wf, "mandarLegales", id, technician(), json!({})).expect("send to legal");
}

/// Hasta `expediente_added`.
pub fn to_expediente(wf: &AdmissionWorkflow, id: Uuid) {
  to_sent_to_legal(wf, id);
  dispatch(wf, "btnLegalesNumIF", id, lawyer(), json!({ "numero": "IF-2025-001-LEG" })).expect("legal IF");
  dispatch(wf, "btnCaratulacion", id, lawyer(), json!({ "numero": "EX-2025-123" })).expect("file number");
}

pub fn formulary_payload() -> FormularyPayload {
  serde_json::from_value(json!({
    "organization_name": "Parroquia San José",
    "representative_name": "Marta Gómez",
    "representative_dni": "28999111",
    "start_date": "2025-03-01",
    "expiry": { "date": "2027-03-01" },
    "beneficiaries": 120
  })).expect("payload")
}

/// Hasta `disposition_formulary_loaded`, ambos formularios con número de IF.
pub fn to_formularies_loaded(wf: &AdmissionWorkflow, id: Uuid) {
  to_expediente(wf, id);
  let legal = ctx(id, lawyer());
  wf.machine.save_formulary(&legal, FormularyKind::ConvenioProject, formulary_payload()).expect("convenio");
  wf.machine.set_formulary_if_number(&legal, FormularyKind::ConvenioProject, "IF-CONV-1").expect("convenio IF");
  wf.machine.save_formulary(&legal, FormularyKind::DispositionProject, formulary_payload()).expect("disposition");
  wf.machine.set_formulary_if_number(&legal, FormularyKind::DispositionProject, "IF-DISP-1").expect("disposition IF");
}
