// technical_report.rs
use crate::admission::AdmissionType;
use crate::choice::Choice;
use crate::complementary::ApprovedOverrides;
use crate::document::FileHandle;
use crate::formulary::ArtifactRefs;
use crate::DomainError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Sub-estado de validación del informe técnico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
  Initiated,
  ForReview,
  ToAmend,
  Validated,
  DocxGenerated,
  DocxEdited,
}

impl Choice for ReportState {
  const ALL: &'static [Self] = &[ReportState::Initiated,
                                 ReportState::ForReview,
                                 ReportState::ToAmend,
                                 ReportState::Validated,
                                 ReportState::DocxGenerated,
                                 ReportState::DocxEdited];

  fn code(&self) -> &'static str {
    match self {
      ReportState::Initiated => "initiated",
      ReportState::ForReview => "for_review",
      ReportState::ToAmend => "to_amend",
      ReportState::Validated => "validated",
      ReportState::DocxGenerated => "docx_generated",
      ReportState::DocxEdited => "docx_edited",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      ReportState::Initiated => "Iniciado",
      ReportState::ForReview => "Para revisión",
      ReportState::ToAmend => "A subsanar",
      ReportState::Validated => "Validado",
      ReportState::DocxGenerated => "DOCX generado",
      ReportState::DocxEdited => "DOCX editado",
    }
  }
}

impl ReportState {
  pub fn is_validated_or_later(&self) -> bool {
    matches!(self, ReportState::Validated | ReportState::DocxGenerated | ReportState::DocxEdited)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormularyState {
  Draft,
  Finalized,
}

/// Acción de guardado del técnico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveAction {
  Draft,
  Submit,
}

/// Decisión del coordinador sobre un informe en revisión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
  ToAmend,
  Validated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Day {
  Lunes,
  Martes,
  Miercoles,
  Jueves,
  Viernes,
  Sabado,
  Domingo,
}

impl Choice for Day {
  const ALL: &'static [Self] = &[Day::Lunes,
                                 Day::Martes,
                                 Day::Miercoles,
                                 Day::Jueves,
                                 Day::Viernes,
                                 Day::Sabado,
                                 Day::Domingo];

  fn code(&self) -> &'static str {
    match self {
      Day::Lunes => "lunes",
      Day::Martes => "martes",
      Day::Miercoles => "miercoles",
      Day::Jueves => "jueves",
      Day::Viernes => "viernes",
      Day::Sabado => "sabado",
      Day::Domingo => "domingo",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      Day::Lunes => "Lunes",
      Day::Martes => "Martes",
      Day::Miercoles => "Miércoles",
      Day::Jueves => "Jueves",
      Day::Viernes => "Viernes",
      Day::Sabado => "Sábado",
      Day::Domingo => "Domingo",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Meal {
  Desayuno,
  Almuerzo,
  Merienda,
  Cena,
}

impl Choice for Meal {
  const ALL: &'static [Self] = &[Meal::Desayuno, Meal::Almuerzo, Meal::Merienda, Meal::Cena];

  fn code(&self) -> &'static str {
    match self {
      Meal::Desayuno => "desayuno",
      Meal::Almuerzo => "almuerzo",
      Meal::Merienda => "merienda",
      Meal::Cena => "cena",
    }
  }

  fn display(&self) -> &'static str {
    match self {
      Meal::Desayuno => "Desayuno",
      Meal::Almuerzo => "Almuerzo",
      Meal::Merienda => "Merienda",
      Meal::Cena => "Cena",
    }
  }
}

/// Prestaciones semanales: 7 días x 4 comidas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealMatrix([[u32; 4]; 7]);

impl MealMatrix {
  pub fn get(&self, day: Day, meal: Meal) -> u32 {
    self.0[day_index(day)][meal_index(meal)]
  }

  pub fn set(&mut self, day: Day, meal: Meal, value: u32) {
    self.0[day_index(day)][meal_index(meal)] = value;
  }

  pub fn weekly_total(&self) -> u32 {
    self.0.iter().flat_map(|row| row.iter()).sum()
  }
}

fn day_index(day: Day) -> usize {
  Day::ALL.iter().position(|d| *d == day).unwrap_or(0)
}

fn meal_index(meal: Meal) -> usize {
  Meal::ALL.iter().position(|m| *m == meal).unwrap_or(0)
}

const TEXT_FIELDS: &[&str] = &["nombre_organizacion",
                               "cuit_organizacion",
                               "nombre_espacio",
                               "domicilio_espacio",
                               "responsable_tarjeta_nombre",
                               "responsable_tarjeta_dni",
                               "delegado_nombre",
                               "delegado_telefono"];

/// Nombres de todos los campos editables del informe, en orden de
/// presentación.
pub static REPORT_FIELDS: Lazy<Vec<String>> = Lazy::new(|| {
  let mut names: Vec<String> = TEXT_FIELDS.iter().map(|s| s.to_string()).collect();
  for prefix in ["solicitudes", "aprobadas"] {
    for meal in Meal::ALL {
      for day in Day::ALL {
        names.push(format!("{}_{}_{}", prefix, meal.code(), day.code()));
      }
    }
  }
  names
});

pub fn is_report_field(name: &str) -> bool {
  REPORT_FIELDS.iter().any(|f| f == name)
}

/// Campo direccionado por nombre.
enum FieldRef {
  Text(usize),
  Requested(Day, Meal),
  Approved(Day, Meal),
}

fn resolve(name: &str) -> Option<FieldRef> {
  if let Some(i) = TEXT_FIELDS.iter().position(|f| *f == name) {
    return Some(FieldRef::Text(i));
  }
  let (prefix, rest) = name.split_once('_')?;
  let (meal, day) = rest.split_once('_')?;
  let meal = Meal::ALL.iter().copied().find(|m| m.code() == meal)?;
  let day = Day::ALL.iter().copied().find(|d| d.code() == day)?;
  match prefix {
    "solicitudes" => Some(FieldRef::Requested(day, meal)),
    "aprobadas" => Some(FieldRef::Approved(day, meal)),
    _ => None,
  }
}

/// Bolsa de campos del informe técnico.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFields {
  text: [Option<String>; 8],
  requested: MealMatrix,
  /// Sólo renovaciones: prestaciones aprobadas en el último convenio.
  approved: Option<MealMatrix>,
}

impl ReportFields {
  pub fn requested(&self) -> &MealMatrix {
    &self.requested
  }

  pub fn approved(&self) -> Option<&MealMatrix> {
    self.approved.as_ref()
  }

  pub fn get(&self, name: &str) -> Option<JsonValue> {
    match resolve(name)? {
      FieldRef::Text(i) => Some(self.text[i].as_ref().map(|s| json!(s)).unwrap_or(JsonValue::Null)),
      FieldRef::Requested(d, m) => Some(json!(self.requested.get(d, m))),
      FieldRef::Approved(d, m) => Some(self.approved.map(|a| json!(a.get(d, m))).unwrap_or(JsonValue::Null)),
    }
  }

  fn set(&mut self, name: &str, value: &JsonValue, admission_type: AdmissionType) -> Result<(), DomainError> {
    let field = resolve(name).ok_or_else(|| DomainError::ValidationError(format!("Campo desconocido '{}'", name)))?;
    match field {
      FieldRef::Text(i) => {
        self.text[i] = match value {
          JsonValue::Null => None,
          JsonValue::String(s) if s.trim().is_empty() => None,
          JsonValue::String(s) => Some(s.trim().to_string()),
          JsonValue::Number(n) => Some(n.to_string()),
          _ => return Err(DomainError::ValidationError(format!("El campo '{}' debe ser texto", name))),
        };
      }
      FieldRef::Requested(d, m) => self.requested.set(d, m, as_count(name, value)?),
      FieldRef::Approved(d, m) => {
        if admission_type != AdmissionType::Renewal {
          return Err(DomainError::ValidationError(format!("El campo '{}' sólo aplica a renovaciones", name)));
        }
        let count = as_count(name, value)?;
        self.approved.get_or_insert_with(MealMatrix::default).set(d, m, count);
      }
    }
    Ok(())
  }
}

fn as_count(name: &str, value: &JsonValue) -> Result<u32, DomainError> {
  let n = match value {
    JsonValue::Number(n) => n.as_u64(),
    JsonValue::String(s) => s.trim().parse::<u64>().ok(),
    _ => None,
  };
  n.and_then(|n| u32::try_from(n).ok())
   .ok_or_else(|| DomainError::ValidationError(format!("El campo '{}' debe ser un entero no negativo", name)))
}

/// Informe técnico de una admisión.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalReport {
  id: Uuid,
  admission_type: AdmissionType,
  state: ReportState,
  formulary_state: FormularyState,
  fields: ReportFields,
  amend_fields: BTreeSet<String>,
  observation: Option<String>,
  draft_artifacts: ArtifactRefs,
  final_artifacts: ArtifactRefs,
  edited_docx: Option<FileHandle>,
  created_by: String,
  updated_at: DateTime<Utc>,
}

impl TechnicalReport {
  pub fn new(admission_type: AdmissionType, created_by: &str) -> Self {
    Self { id: Uuid::new_v4(),
           admission_type,
           state: ReportState::Initiated,
           formulary_state: FormularyState::Draft,
           fields: ReportFields::default(),
           amend_fields: BTreeSet::new(),
           observation: None,
           draft_artifacts: ArtifactRefs::default(),
           final_artifacts: ArtifactRefs::default(),
           edited_docx: None,
           created_by: created_by.to_string(),
           updated_at: Utc::now() }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn state(&self) -> ReportState {
    self.state
  }

  pub fn formulary_state(&self) -> FormularyState {
    self.formulary_state
  }

  pub fn fields(&self) -> &ReportFields {
    &self.fields
  }

  pub fn amend_fields(&self) -> &BTreeSet<String> {
    &self.amend_fields
  }

  pub fn observation(&self) -> Option<&str> {
    self.observation.as_deref()
  }

  pub fn draft_artifacts(&self) -> &ArtifactRefs {
    &self.draft_artifacts
  }

  pub fn final_artifacts(&self) -> &ArtifactRefs {
    &self.final_artifacts
  }

  pub fn edited_docx(&self) -> Option<&FileHandle> {
    self.edited_docx.as_ref()
  }

  pub fn get_field(&self, name: &str) -> Option<JsonValue> {
    self.fields.get(name)
  }

  /// Todos los campos con valor, para contexto de artefactos.
  pub fn snapshot(&self) -> IndexMap<String, JsonValue> {
    REPORT_FIELDS.iter()
                 .filter_map(|f| self.fields.get(f).filter(|v| !v.is_null()).map(|v| (f.clone(), v)))
                 .collect()
  }

  /// Guardado ordinario del técnico. Un informe validado (o posterior) no se
  /// sobrescribe; tampoco uno que está en revisión.
  pub fn save(&mut self, payload: &IndexMap<String, JsonValue>, action: SaveAction) -> Result<(), DomainError> {
    match self.state {
      ReportState::Validated | ReportState::DocxGenerated | ReportState::DocxEdited => {
        return Err(DomainError::InvalidState("report_validated".to_string()));
      }
      ReportState::ForReview => return Err(DomainError::InvalidState("report_under_review".to_string())),
      ReportState::Initiated | ReportState::ToAmend => {}
    }
    let mut fields = self.fields.clone();
    for (name, value) in payload {
      fields.set(name, value, self.admission_type)?;
    }
    self.fields = fields;
    match action {
      SaveAction::Draft => {
        self.formulary_state = FormularyState::Draft;
        self.state = ReportState::Initiated;
      }
      SaveAction::Submit => {
        self.formulary_state = FormularyState::Finalized;
        self.state = ReportState::ForReview;
      }
    }
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Revisión del coordinador sobre un informe `for_review`.
  pub fn review(&mut self, decision: ReviewDecision, amend_fields: &[String], observation: Option<&str>)
                -> Result<(), DomainError> {
    if self.state != ReportState::ForReview {
      return Err(DomainError::InvalidState("report_not_for_review".to_string()));
    }
    match decision {
      ReviewDecision::ToAmend => {
        if amend_fields.is_empty() {
          return Err(DomainError::ValidationError("Debe indicar al menos un campo a subsanar".to_string()));
        }
        if let Some(unknown) = amend_fields.iter().find(|f| !is_report_field(f)) {
          return Err(DomainError::ValidationError(format!("Campo desconocido '{}'", unknown)));
        }
        self.amend_fields = amend_fields.iter().cloned().collect();
        self.observation = observation.map(str::trim).filter(|o| !o.is_empty()).map(str::to_string);
        self.state = ReportState::ToAmend;
      }
      ReviewDecision::Validated => {
        self.amend_fields.clear();
        self.observation = None;
        self.state = ReportState::Validated;
      }
    }
    self.updated_at = Utc::now();
    Ok(())
  }

  pub fn set_draft_artifacts(&mut self, refs: ArtifactRefs) {
    self.draft_artifacts = refs;
  }

  pub fn set_final_artifacts(&mut self, refs: ArtifactRefs) {
    self.final_artifacts = refs;
  }

  /// `validated -> docx_generated`, una vez asignado el IF técnico. Exige
  /// el artefacto final.
  pub fn mark_docx_generated(&mut self) -> Result<(), DomainError> {
    if self.state != ReportState::Validated {
      return Err(DomainError::InvalidState("report_not_validated".to_string()));
    }
    if !self.final_artifacts.is_complete() {
      return Err(DomainError::InvalidState("report_artifacts_missing".to_string()));
    }
    self.state = ReportState::DocxGenerated;
    self.updated_at = Utc::now();
    Ok(())
  }

  /// `docx_generated -> docx_edited`. Devuelve el archivo editado anterior.
  pub fn upload_edited_docx(&mut self, file: FileHandle) -> Result<Option<FileHandle>, DomainError> {
    if self.state != ReportState::DocxGenerated {
      return Err(DomainError::InvalidState("report_docx_not_generated".to_string()));
    }
    self.state = ReportState::DocxEdited;
    self.updated_at = Utc::now();
    Ok(self.edited_docx.replace(file))
  }

  /// Verifica que las sobrescrituras propuestas sean aplicables, sin
  /// modificar el informe.
  pub fn check_overrides(&self, overrides: &[(String, JsonValue)]) -> Result<(), DomainError> {
    let mut fields = self.fields.clone();
    for (name, value) in overrides {
      fields.set(name, value, self.admission_type)?;
    }
    Ok(())
  }

  /// Aplica un complementario aprobado. Todo o nada; devuelve
  /// `(campo, antes, después)` por cada campo cambiado.
  pub fn apply_complementary(&mut self, overrides: &ApprovedOverrides)
                             -> Result<Vec<(String, JsonValue, JsonValue)>, DomainError> {
    if !self.state.is_validated_or_later() {
      return Err(DomainError::InvalidState("report_not_validated".to_string()));
    }
    let mut fields = self.fields.clone();
    let mut changes = Vec::new();
    for (name, value) in overrides.iter() {
      let before = fields.get(name).unwrap_or(JsonValue::Null);
      fields.set(name, value, self.admission_type)?;
      let after = fields.get(name).unwrap_or(JsonValue::Null);
      if before != after {
        changes.push((name.clone(), before, after));
      }
    }
    self.fields = fields;
    self.updated_at = Utc::now();
    Ok(changes)
  }
}
