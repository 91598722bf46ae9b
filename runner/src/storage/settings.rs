//! Settings file management

use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::deployment::TargetEnvironment;
use crate::errors::RunnerError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

pub const ENV_API_TOKEN: &str = "EDGESHIP_API_TOKEN";
pub const ENV_ACCOUNT_ID: &str = "EDGESHIP_ACCOUNT_ID";
pub const ENV_PROJECT_NAME: &str = "EDGESHIP_PROJECT_NAME";
pub const ENV_GIT_REPO: &str = "EDGESHIP_GIT_REPO";

/// Runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Target environment
    #[serde(default)]
    pub environment: TargetEnvironment,

    /// Platform API configuration
    #[serde(default)]
    pub api: ApiSettings,

    /// Polling intervals, timeouts and thresholds
    #[serde(default)]
    pub polling: PollingSettings,

    /// Source control configuration
    #[serde(default)]
    pub git: GitSettings,

    /// Edge availability configuration
    #[serde(default)]
    pub edge: EdgeSettings,

    /// Bearer token, never read from or written to the settings file
    #[serde(skip)]
    pub api_token: Option<SecretString>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            environment: TargetEnvironment::Production,
            api: ApiSettings::default(),
            polling: PollingSettings::default(),
            git: GitSettings::default(),
            edge: EdgeSettings::default(),
            api_token: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file and apply environment overrides
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let file = File::new(path.as_ref());
        let mut settings: Settings = file.read_json().await?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        debug!("Loaded settings from {}", file.path().display());
        Ok(settings)
    }

    /// Check values serde defaults cannot guard
    pub fn validate(&self) -> Result<(), RunnerError> {
        let polling = &self.polling;
        for (field, value) in [
            ("deployment_check_interval_ms", polling.deployment_check_interval_ms),
            ("deployment_timeout_ms", polling.deployment_timeout_ms),
            ("provisioner_check_interval_ms", polling.provisioner_check_interval_ms),
            ("provisioner_timeout_ms", polling.provisioner_timeout_ms),
        ] {
            if value == 0 {
                return Err(RunnerError::ConfigError(format!("polling.{} must be non-zero", field)));
            }
        }
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|t| !t.is_empty()) {
            self.api_token = Some(SecretString::from(token));
        }
        if let Some(account_id) = lookup(ENV_ACCOUNT_ID) {
            self.api.account_id = account_id;
        }
        if let Some(project_name) = lookup(ENV_PROJECT_NAME) {
            self.api.project_name = project_name;
        }
        if let Some(repo_url) = lookup(ENV_GIT_REPO) {
            self.git.repo_url = Some(repo_url);
        }
    }
}

/// Platform API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL for the platform API
    #[serde(default = "default_api_url")]
    pub base_url: String,

    #[serde(default)]
    pub account_id: String,

    #[serde(default)]
    pub project_name: String,

    /// Base URL of the dashboard, used in failure messages
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,
}

fn default_api_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_dashboard_url() -> String {
    "https://dash.cloudflare.com".to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            account_id: String::new(),
            project_name: String::new(),
            dashboard_url: default_dashboard_url(),
        }
    }
}

/// Polling settings, all durations in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_deployment_check_interval")]
    pub deployment_check_interval_ms: u64,

    #[serde(default = "default_deployment_timeout")]
    pub deployment_timeout_ms: u64,

    #[serde(default = "default_api_failures_threshold")]
    pub deployment_check_api_failures_threshold: u32,

    #[serde(default = "default_provisioner_check_interval")]
    pub provisioner_check_interval_ms: u64,

    #[serde(default = "default_provisioner_timeout")]
    pub provisioner_timeout_ms: u64,
}

fn default_deployment_check_interval() -> u64 {
    5_000
}

fn default_deployment_timeout() -> u64 {
    600_000
}

fn default_api_failures_threshold() -> u32 {
    5
}

fn default_provisioner_check_interval() -> u64 {
    2_000
}

fn default_provisioner_timeout() -> u64 {
    180_000
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            deployment_check_interval_ms: default_deployment_check_interval(),
            deployment_timeout_ms: default_deployment_timeout(),
            deployment_check_api_failures_threshold: default_api_failures_threshold(),
            provisioner_check_interval_ms: default_provisioner_check_interval(),
            provisioner_timeout_ms: default_provisioner_timeout(),
        }
    }
}

/// Source control settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSettings {
    /// Remote the fixture branch is pushed to
    #[serde(default)]
    pub repo_url: Option<String>,

    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,

    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
}

fn default_author_name() -> String {
    "edgeship".to_string()
}

fn default_author_email() -> String {
    "edgeship@users.noreply.github.com".to_string()
}

fn default_branch_prefix() -> String {
    "edgeship".to_string()
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            repo_url: None,
            author_name: default_author_name(),
            author_email: default_author_email(),
            branch_prefix: default_branch_prefix(),
        }
    }
}

/// Edge availability settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSettings {
    /// Statuses meaning the artifact is not served yet
    #[serde(default = "default_not_provisioned_statuses")]
    pub not_provisioned_statuses: Vec<u16>,

    /// Header whose presence means the artifact is not served yet
    #[serde(default)]
    pub not_provisioned_header: Option<String>,
}

fn default_not_provisioned_statuses() -> Vec<u16> {
    vec![404]
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            not_provisioned_statuses: default_not_provisioned_statuses(),
            not_provisioned_header: None,
        }
    }
}
