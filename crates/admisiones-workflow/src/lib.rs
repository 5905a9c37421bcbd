//! admisiones-workflow: máquina de estados de las admisiones de comedores
//!
//! Orquesta los dos ejes de estado de una admisión (documental y legal),
//! el registro de documentos, los formularios legales, el informe técnico y
//! el complementario. Cada operación es una unidad: se confirma completa
//! con su historial o no deja rastro.
//!
//! `TransitionRouter` expone las acciones por clave POST;
//! `AdmissionWorkflowFactory` arma todo en memoria.

pub mod actions;
pub mod artifacts;
pub mod config;
pub mod context;
pub mod errors;
pub mod factory;
pub mod files;
pub mod guard;
pub mod machine;
pub mod notifications;
pub mod registry;
pub mod router;
pub mod stubs;
pub mod tracking;
pub mod transition;

pub use actions::{available_actions, Action};
pub use artifacts::{ArtifactGenerator, ArtifactKind, ArtifactRequest};
pub use config::WorkflowConfig;
pub use context::{ActionContext, TransitionOutcome};
pub use errors::WorkflowError;
pub use factory::{AdmissionWorkflow, AdmissionWorkflowFactory};
pub use files::{FileStore, InMemoryFileStore, Upload};
pub use machine::AdmissionStateMachine;
pub use notifications::{StateEvent, StateNotification, StateNotifier};
pub use registry::{DocumentRegistry, DocumentSlot};
pub use router::TransitionRouter;
pub use stubs::{RecordingNotifier, StubArtifactGenerator};
