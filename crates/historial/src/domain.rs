// Archivo: domain.rs
// Propósito: tipos del historial. Cada `HistoryEntry` es autocontenido: lleva
// el cambio tipado (antes/después), el actor, el cursor dentro del historial
// de la admisión y un `command_id` opcional para idempotencia.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// Eje de estado al que pertenece un cambio de estado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateAxis {
    /// `admission_state`
    Admission,
    /// `legal_state`
    Legal,
}

/// Valor de una opción con su código estable y su etiqueta visible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Labelled {
    pub code: String,
    pub display: String,
}

impl Labelled {
    pub fn new(code: impl Into<String>, display: impl Into<String>) -> Self {
        Self { code: code.into(), display: display.into() }
    }
}

impl fmt::Display for Labelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// Valor tipado de un campo antes o después de un cambio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChangeValue {
    Empty,
    Flag(bool),
    Text(String),
    Number(i64),
    Choice(Labelled),
    Json(JsonValue),
}

impl ChangeValue {
    /// Texto opcional: `None` o cadena vacía se registran como `Empty`.
    pub fn text(value: Option<&str>) -> Self {
        match value {
            Some(s) if !s.is_empty() => ChangeValue::Text(s.to_string()),
            _ => ChangeValue::Empty,
        }
    }

    /// Convierte un valor JSON arbitrario preservando el tipo cuando es
    /// escalar.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => ChangeValue::Empty,
            JsonValue::Bool(b) => ChangeValue::Flag(*b),
            JsonValue::String(s) => ChangeValue::Text(s.clone()),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => ChangeValue::Number(i),
                None => ChangeValue::Json(value.clone()),
            },
            other => ChangeValue::Json(other.clone()),
        }
    }
}

impl fmt::Display for ChangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeValue::Empty => write!(f, "-"),
            ChangeValue::Flag(true) => write!(f, "Sí"),
            ChangeValue::Flag(false) => write!(f, "No"),
            ChangeValue::Text(s) => write!(f, "{}", s),
            ChangeValue::Number(n) => write!(f, "{}", n),
            ChangeValue::Choice(l) => write!(f, "{}", l.display),
            ChangeValue::Json(v) => write!(f, "{}", v),
        }
    }
}

/// Cambio registrado en el historial, con valores antes/después tipados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryChange {
    StateChange {
        axis: StateAxis,
        from: Option<Labelled>,
        to: Labelled,
        reason: Option<String>,
    },
    FieldChange {
        field: String,
        label: String,
        before: ChangeValue,
        after: ChangeValue,
    },
    DocumentStatusChange {
        document_id: Uuid,
        document: String,
        from: Option<Labelled>,
        to: Labelled,
        observations: Option<String>,
    },
    ComplementaryAction {
        action: String,
        detail: JsonValue,
    },
    /// Advertencia no fatal (por ejemplo, fallo al generar un artefacto).
    ArtifactWarning {
        artifact: String,
        message: String,
    },
}

/// Clasificación plana de `HistoryChange` para filtrar lecturas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    StateChange,
    FieldChange,
    DocumentStatusChange,
    ComplementaryAction,
    ArtifactWarning,
}

impl HistoryChange {
    pub fn kind(&self) -> HistoryKind {
        match self {
            HistoryChange::StateChange { .. } => HistoryKind::StateChange,
            HistoryChange::FieldChange { .. } => HistoryKind::FieldChange,
            HistoryChange::DocumentStatusChange { .. } => HistoryKind::DocumentStatusChange,
            HistoryChange::ComplementaryAction { .. } => HistoryKind::ComplementaryAction,
            HistoryChange::ArtifactWarning { .. } => HistoryKind::ArtifactWarning,
        }
    }
}

/// Registro persistido del historial de una admisión.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub admission_id: Uuid,
    /// Posición dentro del historial de la admisión (1, 2, 3...).
    pub cursor: i64,
    pub change: HistoryChange,
    /// Identificador opaco del actor que originó el cambio.
    pub actor: String,
    /// Identificador de comando para deduplicar reenvíos.
    pub command_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn kind(&self) -> HistoryKind {
        self.change.kind()
    }
}

/// Metadatos ligeros del historial de una admisión.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMeta {
    pub admission_id: Uuid,
    pub current_cursor: i64,
    pub current_version: i64,
    pub created_at: DateTime<Utc>,
}

/// Resultado de persistir un lote de registros con control optimista.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistResult {
    Ok { new_version: i64 },
    Conflict,
}
