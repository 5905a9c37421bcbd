//! Colaboradores en memoria para pruebas, ejemplos y la CLI.
use crate::artifacts::{ArtifactGenerator, ArtifactRequest};
use crate::errors::WorkflowError;
use crate::notifications::{StateEvent, StateNotification, StateNotifier};
use admisiones_domain::{ArtifactRefs, FileHandle};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Generador que devuelve handles `mem://artefactos/...`. Puede configurarse
/// para fallar o demorarse y así ejercitar la política de fallos.
#[derive(Default)]
pub struct StubArtifactGenerator {
  failing: AtomicBool,
  delay_ms: AtomicU64,
  calls: AtomicUsize,
}

impl StubArtifactGenerator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_failing(&self, failing: bool) {
    self.failing.store(failing, Ordering::SeqCst);
  }

  pub fn set_delay(&self, delay: Duration) {
    self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl ArtifactGenerator for StubArtifactGenerator {
  fn generate(&self, request: &ArtifactRequest) -> Result<ArtifactRefs, WorkflowError> {
    let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    let delay = self.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      thread::sleep(Duration::from_millis(delay));
    }
    if self.failing.load(Ordering::SeqCst) {
      return Err(WorkflowError::ArtifactGenerationFailure(format!("{}: servicio no disponible", request.template)));
    }
    let base = format!("mem://artefactos/{}/{}-{}", request.admission_id, request.kind, n);
    Ok(ArtifactRefs::new(FileHandle::new(format!("{}.pdf", base)), FileHandle::new(format!("{}.docx", base))))
  }
}

/// Notificador que guarda lo recibido.
#[derive(Default)]
pub struct RecordingNotifier {
  received: Mutex<Vec<StateNotification>>,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn received(&self) -> Vec<StateNotification> {
    match self.received.lock() {
      Ok(g) => g.clone(),
      Err(p) => p.into_inner().clone(),
    }
  }

  pub fn events(&self) -> Vec<StateEvent> {
    self.received().into_iter().map(|n| n.event).collect()
  }
}

impl StateNotifier for RecordingNotifier {
  fn notify(&self, notification: &StateNotification) {
    match self.received.lock() {
      Ok(mut g) => g.push(notification.clone()),
      Err(_) => log::warn!("notificador con lock envenenado; se descarta {:?}", notification.event),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::artifacts::ArtifactKind;
  use serde_json::json;
  use uuid::Uuid;

  fn request() -> ArtifactRequest {
    ArtifactRequest { admission_id: Uuid::new_v4(),
                      kind: ArtifactKind::ConvenioProject,
                      template: "convenio_eclesiastica".to_string(),
                      context: json!({}) }
  }

  #[test]
  fn stub_generator_toggles_failure() {
    let g = StubArtifactGenerator::new();
    let ok = g.generate(&request());
    assert!(matches!(ok, Ok(ref r) if r.is_complete()));
    g.set_failing(true);
    assert!(matches!(g.generate(&request()), Err(WorkflowError::ArtifactGenerationFailure(_))));
    assert_eq!(g.calls(), 2);
  }
}
