// kitchen.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Referencia de sólo lectura a un comedor. Los descriptores se usan para
/// generar artefactos y para mostrar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitchenRef {
  pub id: Uuid,
  pub name: String,
  pub organization: String,
  pub province: String,
  pub delegate: Option<String>,
}

impl KitchenRef {
  pub fn new(name: &str, organization: &str, province: &str, delegate: Option<&str>) -> Self {
    Self { id: Uuid::new_v4(),
           name: name.to_string(),
           organization: organization.to_string(),
           province: province.to_string(),
           delegate: delegate.map(|d| d.to_string()) }
  }
}
