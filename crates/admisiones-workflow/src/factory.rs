use crate::config::WorkflowConfig;
use crate::errors::WorkflowError;
use crate::files::InMemoryFileStore;
use crate::machine::AdmissionStateMachine;
use crate::router::TransitionRouter;
use crate::stubs::{RecordingNotifier, StubArtifactGenerator};
use admisiones_domain::{AdmissionRepository, DomainStubs, SampleData};
use historial::{HistoryRepository, InMemoryHistoryRepository};
use std::sync::Arc;

/// Motor armado con sus colaboradores, listo para usar.
pub struct AdmissionWorkflow {
  pub machine: Arc<AdmissionStateMachine>,
  pub router: TransitionRouter,
  /// Comedor y convenios sembrados.
  pub sample: SampleData,
  pub files: Arc<InMemoryFileStore>,
  pub artifacts: Arc<StubArtifactGenerator>,
  pub notifier: Arc<RecordingNotifier>,
}

/// Fábrica del motor de admisiones.
///
/// Arma la máquina de estados sobre repositorios en memoria sembrados con
/// `DomainStubs::sample`, un almacén de archivos en memoria y generador y
/// notificador de prueba. La usan los tests, la CLI y los ejemplos.
pub struct AdmissionWorkflowFactory;

impl AdmissionWorkflowFactory {
  /// Configuración tomada del entorno (`.env` incluido).
  pub fn in_memory() -> Result<AdmissionWorkflow, WorkflowError> {
    Self::with_config(WorkflowConfig::from_env()?)
  }

  pub fn with_config(config: WorkflowConfig) -> Result<AdmissionWorkflow, WorkflowError> {
    let sample = DomainStubs::sample()?;
    let repo: Arc<dyn AdmissionRepository> = sample.repo.clone();
    let history: Arc<dyn HistoryRepository> = Arc::new(InMemoryHistoryRepository::new());
    let files = Arc::new(InMemoryFileStore::new());
    let artifacts = Arc::new(StubArtifactGenerator::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let machine = Arc::new(AdmissionStateMachine::new(repo,
                                                      history,
                                                      files.clone(),
                                                      artifacts.clone(),
                                                      notifier.clone(),
                                                      config));
    log::debug!("motor de admisiones armado en memoria");
    Ok(AdmissionWorkflow { router: TransitionRouter::new(machine.clone()),
                           machine,
                           sample,
                           files,
                           artifacts,
                           notifier })
  }
}
