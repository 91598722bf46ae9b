//! Shared state of a deployment run

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::app::options::RunOptions;
use crate::deploy::git::CommitAuthor;
use crate::deploy::mutex::{LocalMutex, MutexTransport};
use crate::deploy::teardown::Teardown;
use crate::errors::RunnerError;
use crate::http::client::PlatformClient;
use crate::http::edge::EdgeProbe;
use crate::storage::settings::{GitSettings, Settings, ENV_API_TOKEN};
use crate::workers::provisioner::{ProvisioningSignal, StatusSignal};

const EDGE_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Collaborators and options shared by every step of a run
pub struct RunContext {
    /// Platform API client for the configured project
    pub client: Arc<PlatformClient>,

    /// Lock service serializing project reconfiguration
    pub mutex: Arc<dyn MutexTransport>,

    /// Compensating actions registered during the run
    pub teardown: Arc<Teardown>,

    /// Client for probing deployed URLs
    pub edge_probe: EdgeProbe,

    /// Predicate for "not yet provisioned" responses
    pub signal: Arc<dyn ProvisioningSignal>,

    /// Source control settings
    pub git: GitSettings,

    /// Polling and environment options
    pub options: RunOptions,
}

impl RunContext {
    /// Build a context from settings with an in-process lock service
    pub fn from_settings(settings: &Settings) -> Result<Self, RunnerError> {
        Self::with_mutex(settings, Arc::new(LocalMutex::new()))
    }

    /// Build a context from settings with the given lock service
    pub fn with_mutex(settings: &Settings, mutex: Arc<dyn MutexTransport>) -> Result<Self, RunnerError> {
        info!("Initializing run context...");
        settings.validate()?;

        let token = settings
            .api_token
            .clone()
            .ok_or_else(|| RunnerError::Precondition(format!("{} is not set", ENV_API_TOKEN)))?;
        if settings.api.account_id.is_empty() {
            return Err(RunnerError::Precondition("api.account_id is not set".to_string()));
        }
        if settings.api.project_name.is_empty() {
            return Err(RunnerError::Precondition("api.project_name is not set".to_string()));
        }

        let client = Arc::new(PlatformClient::new(
            &settings.api.base_url,
            &settings.api.account_id,
            &settings.api.project_name,
            token,
        )?);

        Ok(Self {
            client,
            mutex,
            teardown: Arc::new(Teardown::new()),
            edge_probe: EdgeProbe::new(EDGE_PROBE_TIMEOUT)?,
            signal: Arc::new(StatusSignal::try_from(&settings.edge)?),
            git: settings.git.clone(),
            options: RunOptions::from(settings),
        })
    }

    /// Author identity for fixture commits
    pub fn commit_author(&self) -> CommitAuthor {
        CommitAuthor {
            name: self.git.author_name.clone(),
            email: self.git.author_email.clone(),
        }
    }
}
