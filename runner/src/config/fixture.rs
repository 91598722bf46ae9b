//! Fixture definition

use std::path::{Path, PathBuf};

use platform_api::BuildConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::deployment::DeploymentConfig;
use crate::config::features::FeatureCatalog;
use crate::errors::RunnerError;
use crate::filesys::file::File;

/// A site fixture to deploy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub name: String,

    #[serde(default)]
    pub build: BuildSettings,

    /// Feature names applied in order on top of `config`
    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub config: DeploymentConfig,

    /// Directory pushed to the remote repository, relative to the fixture file
    #[serde(default = "default_site_dir")]
    pub site_dir: PathBuf,

    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_site_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Raw build fields of a fixture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSettings {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub root_dir: Option<String>,
}

impl BuildSettings {
    /// Remote build config these settings should produce
    pub fn to_remote(&self) -> BuildConfig {
        BuildConfig {
            build_command: self.command.clone(),
            destination_dir: self.output_dir.clone(),
            root_dir: self.root_dir.clone(),
        }
    }
}

impl Fixture {
    /// Load a fixture from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let mut fixture: Fixture = File::new(path).read_json().await?;
        fixture.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        info!("Loaded fixture \"{}\" from {}", fixture.name, path.display());
        Ok(fixture)
    }

    /// Absolute location of the site to publish
    pub fn site_path(&self) -> PathBuf {
        self.base_dir.join(&self.site_dir)
    }

    /// Fixture config merged with its features, in listed order
    pub fn deployment_config(&self, catalog: &FeatureCatalog) -> Result<DeploymentConfig, RunnerError> {
        let features = catalog.resolve(&self.features)?;
        Ok(DeploymentConfig::merged(
            std::iter::once(&self.config).chain(features),
        ))
    }
}
