//! Crate `historial` — registro de sólo-anexado de cambios de una admisión
//!
//! Define los tipos del historial (`HistoryEntry`, `HistoryChange`,
//! `HistoryMeta`), el contrato de persistencia `HistoryRepository`, una
//! implementación en memoria (`InMemoryHistoryRepository`) y el helper
//! `HistoryLog` que asigna cursores y persiste lotes.
//!
//! Diseño resumido:
//! - Cada cambio es tipado (estado, campo, documento, complementario,
//!   advertencia) con valores antes/después.
//! - Los lotes se persisten completos o no se persisten.
//! - Idempotencia: `command_id` permite detectar reenvíos.
//! - Locking optimista: `expected_version` detecta escrituras concurrentes.
//!
//! Ejemplo rápido:
//! ```rust
//! use historial::{HistoryChange, HistoryLog, InMemoryHistoryRepository};
//! use std::sync::Arc;
//! let log = HistoryLog::new(Arc::new(InMemoryHistoryRepository::new()));
//! let id = uuid::Uuid::new_v4();
//! log.record(id, "tecnico-1", None, vec![HistoryChange::ComplementaryAction { action: "demo".into(),
//!                                                                             detail: serde_json::json!({}) }])
//!    .unwrap();
//! assert_eq!(log.count(&id).unwrap(), 1);
//! ```
pub mod domain;
pub mod engine;
pub mod errors;
pub mod repository;
pub mod stubs;

pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use repository::*;
pub use stubs::*;
