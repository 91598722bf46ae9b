//! Run configuration options

use std::time::Duration;

use crate::config::deployment::TargetEnvironment;
use crate::storage::settings::Settings;
use crate::workers::poller::PollOptions;

/// Options for one deployment run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Target environment
    pub environment: TargetEnvironment,

    /// Dashboard base URL for failure messages
    pub dashboard_url: String,

    /// Deployment poller configuration
    pub deployment: DeploymentPollOptions,

    /// Edge availability poller configuration
    pub provisioner: ProvisionerPollOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            environment: TargetEnvironment::Production,
            dashboard_url: "https://dash.cloudflare.com".to_string(),
            deployment: DeploymentPollOptions::default(),
            provisioner: ProvisionerPollOptions::default(),
        }
    }
}

impl From<&Settings> for RunOptions {
    fn from(settings: &Settings) -> Self {
        let polling = &settings.polling;
        Self {
            environment: settings.environment,
            dashboard_url: settings.api.dashboard_url.clone(),
            deployment: DeploymentPollOptions {
                check_interval: Duration::from_millis(polling.deployment_check_interval_ms),
                timeout: Duration::from_millis(polling.deployment_timeout_ms),
                api_failures_threshold: polling.deployment_check_api_failures_threshold,
            },
            provisioner: ProvisionerPollOptions {
                check_interval: Duration::from_millis(polling.provisioner_check_interval_ms),
                timeout: Duration::from_millis(polling.provisioner_timeout_ms),
            },
        }
    }
}

/// Deployment completion polling
#[derive(Debug, Clone)]
pub struct DeploymentPollOptions {
    pub check_interval: Duration,

    pub timeout: Duration,

    /// Failed status checks tolerated before the run fails
    pub api_failures_threshold: u32,
}

impl Default for DeploymentPollOptions {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(600), // 10 minutes
            api_failures_threshold: 5,
        }
    }
}

impl DeploymentPollOptions {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            operation: "Deployment check".to_string(),
            interval: self.check_interval,
            timeout: self.timeout,
        }
    }
}

/// Edge availability polling
#[derive(Debug, Clone)]
pub struct ProvisionerPollOptions {
    pub check_interval: Duration,

    pub timeout: Duration,
}

impl Default for ProvisionerPollOptions {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(180), // 3 minutes
        }
    }
}

impl ProvisionerPollOptions {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            operation: "Provisioning check".to_string(),
            interval: self.check_interval,
            timeout: self.timeout,
        }
    }
}
