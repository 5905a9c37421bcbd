use historial::{HistoryChange, HistoryKind, HistoryLog, InMemoryHistoryRepository, Labelled, PersistResult, StateAxis};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn state_change(from: Option<&str>, to: &str) -> HistoryChange {
  HistoryChange::StateChange { axis: StateAxis::Admission,
                               from: from.map(|c| Labelled::new(c, c)),
                               to: Labelled::new(to, to),
                               reason: None }
}

#[test]
fn record_assigns_consecutive_cursors_across_batches() {
  let log = HistoryLog::new(Arc::new(InMemoryHistoryRepository::new()));
  let id = Uuid::new_v4();
  log.record(id, "tecnico-1", None, vec![state_change(None, "convention_selected")]).expect("first");
  log.record(id,
             "tecnico-1",
             None,
             vec![state_change(Some("convention_selected"), "documentation_in_progress"),
                  HistoryChange::ComplementaryAction { action: "noop".into(), detail: json!({}) }])
     .expect("second");
  let entries = log.entries(&id).expect("entries");
  let cursors: Vec<i64> = entries.iter().map(|e| e.cursor).collect();
  assert_eq!(cursors, vec![1, 2, 3]);
  assert_eq!(log.entries_of_kind(&id, HistoryKind::StateChange).unwrap().len(), 2);
}

#[test]
fn empty_batch_does_not_bump_version() {
  let repo = Arc::new(InMemoryHistoryRepository::new());
  let log = HistoryLog::new(repo.clone());
  let id = Uuid::new_v4();
  let res = log.record(id, "coordinador", None, vec![]).unwrap();
  assert_eq!(res, PersistResult::Ok { new_version: 0 });
  assert_eq!(log.count(&id).unwrap(), 0);
}

#[test]
fn has_command_detects_replays() {
  let log = HistoryLog::new(Arc::new(InMemoryHistoryRepository::new()));
  let id = Uuid::new_v4();
  let cmd = Uuid::new_v4();
  log.record(id, "abogado", Some(cmd), vec![state_change(None, "x")]).unwrap();
  assert!(log.has_command(&id, &cmd).unwrap());
}
