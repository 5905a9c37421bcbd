use crate::errors::WorkflowError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parámetros de ejecución del motor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
  /// Tiempo máximo de generación de un artefacto (PDF + DOCX).
  pub artifact_timeout: Duration,
  /// Vigencia del catálogo de documentos en caché.
  pub catalog_ttl: Duration,
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    Self { artifact_timeout: Duration::from_secs(10),
           catalog_ttl: Duration::from_secs(60) }
  }
}

impl WorkflowConfig {
  /// Carga `.env` si existe y sobrescribe los valores por defecto con
  /// `ADMISIONES_ARTIFACT_TIMEOUT_MS` y `ADMISIONES_CATALOG_TTL_SECS`.
  pub fn from_env() -> Result<Self, WorkflowError> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Igual que `from_env` pero leyendo de una función arbitraria.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkflowError>
    where F: Fn(&str) -> Option<String>
  {
    let mut cfg = Self::default();
    if let Some(ms) = read_u64(&lookup, "ADMISIONES_ARTIFACT_TIMEOUT_MS")? {
      cfg.artifact_timeout = Duration::from_millis(ms);
    }
    if let Some(secs) = read_u64(&lookup, "ADMISIONES_CATALOG_TTL_SECS")? {
      cfg.catalog_ttl = Duration::from_secs(secs);
    }
    Ok(cfg)
  }
}

fn read_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, WorkflowError>
  where F: Fn(&str) -> Option<String>
{
  match lookup(key) {
    None => Ok(None),
    Some(raw) => raw.trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| WorkflowError::ValidationFailure(format!("{} inválido: '{}'", key, raw))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn lookup_overrides_defaults() -> Result<(), WorkflowError> {
    let vars: HashMap<&str, &str> = [("ADMISIONES_ARTIFACT_TIMEOUT_MS", "250")].into_iter().collect();
    let cfg = WorkflowConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))?;
    assert_eq!(cfg.artifact_timeout, Duration::from_millis(250));
    assert_eq!(cfg.catalog_ttl, Duration::from_secs(60));
    Ok(())
  }

  #[test]
  fn malformed_value_is_a_validation_failure() {
    let res = WorkflowConfig::from_lookup(|k| (k == "ADMISIONES_CATALOG_TTL_SECS").then(|| "uno".to_string()));
    assert!(matches!(res, Err(WorkflowError::ValidationFailure(_))));
  }
}
