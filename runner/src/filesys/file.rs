//! File operations

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::errors::RunnerError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, RunnerError> {
        let mut file = fs::File::open(&self.path).await.map_err(|e| {
            RunnerError::ConfigError(format!("Unable to open {}: {}", self.path.display(), e))
        })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        Ok(contents)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, RunnerError> {
        let contents = self.read_string().await?;
        serde_json::from_str(&contents).map_err(|e| {
            RunnerError::ConfigError(format!("Invalid JSON in {}: {}", self.path.display(), e))
        })
    }
}
