//! Features catalog

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::deployment::DeploymentConfig;
use crate::errors::RunnerError;
use crate::filesys::file::File;

/// Named partial deployment configs a fixture can opt into
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCatalog {
    features: BTreeMap<String, DeploymentConfig>,
}

impl FeatureCatalog {
    pub fn new(features: BTreeMap<String, DeploymentConfig>) -> Self {
        Self { features }
    }

    /// Load a catalog from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let catalog: FeatureCatalog = File::new(path.as_ref()).read_json().await?;
        debug!("Loaded {} features from {}", catalog.features.len(), path.as_ref().display());
        Ok(catalog)
    }

    /// Resolve feature names in the order they were listed
    pub fn resolve(&self, names: &[String]) -> Result<Vec<&DeploymentConfig>, RunnerError> {
        names
            .iter()
            .map(|name| {
                self.features.get(name).ok_or_else(|| {
                    RunnerError::Precondition(format!("unknown feature \"{}\"", name))
                })
            })
            .collect()
    }
}
