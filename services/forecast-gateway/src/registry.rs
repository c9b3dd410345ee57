//! Process-wide, read-only mapping from SKU to trained model.
//!
//! Loaded once from a JSON artifact at startup. A failed load is not fatal: the
//! service keeps running in [`RegistryState::Unavailable`] and every prediction
//! reports [`ForecastError::RegistryUnavailable`].

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::error::ForecastError;
use crate::model::{AdditiveModel, Forecaster};

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model artifact not found at {0}")]
    Missing(PathBuf),
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model artifact digest mismatch expected={expected} actual={actual}")]
    DigestMismatch { expected: String, actual: String },
    #[error("unsupported artifact format version {0}")]
    UnsupportedVersion(u32),
    #[error("model '{key}' is invalid: {reason}")]
    InvalidModel { key: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct Artifact {
    format_version: u32,
    models: BTreeMap<String, AdditiveModel>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn Forecaster>>,
}

impl ModelRegistry {
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> Result<Self, LoadError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(LoadError::Missing(path.to_path_buf())),
            Err(e) => return Err(e.into()),
        };
        if let Some(expect) = expected_sha256.map(str::trim).filter(|e| !e.is_empty()) {
            let actual = hex::encode(Sha256::digest(&bytes));
            if !expect.eq_ignore_ascii_case(&actual) {
                return Err(LoadError::DigestMismatch { expected: expect.to_string(), actual });
            }
        }
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        let artifact: Artifact = serde_json::from_slice(bytes)?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION { return Err(LoadError::UnsupportedVersion(artifact.format_version)); }
        let mut models: HashMap<String, Arc<dyn Forecaster>> = HashMap::with_capacity(artifact.models.len());
        for (key, mut model) in artifact.models {
            model.validate().map_err(|reason| LoadError::InvalidModel { key: key.clone(), reason })?;
            model.normalize();
            models.insert(key, Arc::new(model));
        }
        Ok(Self { models })
    }

    pub fn from_models<I>(models: I) -> Self
    where I: IntoIterator<Item = (String, Arc<dyn Forecaster>)> {
        Self { models: models.into_iter().collect() }
    }

    /// Exact-match lookup.
    pub fn lookup(&self, key: &str) -> Result<Arc<dyn Forecaster>, ForecastError> {
        self.models.get(key).cloned().ok_or_else(|| ForecastError::UnknownModel(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool { self.models.contains_key(key) }
    pub fn len(&self) -> usize { self.models.len() }
    pub fn is_empty(&self) -> bool { self.models.is_empty() }

    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.models.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

/// Registry plus the explicit "never loaded" sentinel.
#[derive(Debug, Clone)]
pub enum RegistryState {
    Loaded(ModelRegistry),
    Unavailable { reason: String },
}

impl RegistryState {
    /// Load the artifact, downgrading any failure to `Unavailable`.
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> Self {
        let state = match ModelRegistry::load(path, expected_sha256) {
            Ok(reg) => {
                info!(models = reg.len(), path = %path.display(), "model registry loaded");
                RegistryState::Loaded(reg)
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "model registry unavailable, predictions will fail until restart");
                RegistryState::Unavailable { reason: e.to_string() }
            }
        };
        forecast_core::FORECAST_METRICS.models_loaded.set(state.model_count() as i64);
        state
    }

    pub fn registry(&self) -> Result<&ModelRegistry, ForecastError> {
        match self {
            RegistryState::Loaded(reg) => Ok(reg),
            RegistryState::Unavailable { .. } => Err(ForecastError::RegistryUnavailable),
        }
    }

    pub fn lookup(&self, key: &str) -> Result<Arc<dyn Forecaster>, ForecastError> { self.registry()?.lookup(key) }
    pub fn is_loaded(&self) -> bool { matches!(self, RegistryState::Loaded(_)) }
    pub fn model_count(&self) -> usize { self.registry().map(ModelRegistry::len).unwrap_or(0) }
}

impl From<ModelRegistry> for RegistryState {
    fn from(reg: ModelRegistry) -> Self { RegistryState::Loaded(reg) }
}
