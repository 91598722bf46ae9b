//! Edge availability poller

use std::sync::Arc;

use reqwest::header::HeaderName;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::errors::RunnerError;
use crate::http::edge::{EdgeProbe, EdgeResponse};
use crate::storage::settings::EdgeSettings;
use crate::workers::poller::{self, Classifier, PollHandle, PollOptions, Verdict};

/// Decides whether a probe response means the artifact is not served yet
pub trait ProvisioningSignal: Send + Sync {
    fn is_not_provisioned(&self, response: &EdgeResponse) -> bool;
}

/// Treats configured statuses, or the presence of a configured header, as not provisioned
#[derive(Debug, Clone)]
pub struct StatusSignal {
    statuses: Vec<StatusCode>,
    header: Option<HeaderName>,
}

impl StatusSignal {
    pub fn new(statuses: Vec<StatusCode>, header: Option<HeaderName>) -> Self {
        Self { statuses, header }
    }
}

impl TryFrom<&EdgeSettings> for StatusSignal {
    type Error = RunnerError;

    fn try_from(settings: &EdgeSettings) -> Result<Self, Self::Error> {
        let statuses = settings
            .not_provisioned_statuses
            .iter()
            .map(|code| {
                StatusCode::from_u16(*code)
                    .map_err(|e| RunnerError::ConfigError(format!("Invalid status {}: {}", code, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let header = settings
            .not_provisioned_header
            .as_deref()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| RunnerError::ConfigError(format!("Invalid header {}: {}", name, e)))
            })
            .transpose()?;
        Ok(Self::new(statuses, header))
    }
}

impl ProvisioningSignal for StatusSignal {
    fn is_not_provisioned(&self, response: &EdgeResponse) -> bool {
        self.statuses.contains(&response.status)
            || self
                .header
                .as_ref()
                .is_some_and(|header| response.headers.contains_key(header))
    }
}

/// Probe failures are expected while provisioning and never fail the loop
pub struct EdgeClassifier {
    signal: Arc<dyn ProvisioningSignal>,
}

impl EdgeClassifier {
    pub fn new(signal: Arc<dyn ProvisioningSignal>) -> Self {
        Self { signal }
    }
}

impl Classifier<EdgeResponse> for EdgeClassifier {
    type Output = ();

    fn classify(&mut self, observation: Result<EdgeResponse, RunnerError>) -> Verdict<()> {
        match observation {
            Ok(response) if self.signal.is_not_provisioned(&response) => {
                debug!("Deployment not provisioned yet ({})", response.status);
                Verdict::Pending
            }
            Ok(response) => {
                debug!("Deployment provisioned ({})", response.status);
                Verdict::Success(())
            }
            Err(err) => {
                warn!("Edge probe failed, still provisioning: {}", err);
                Verdict::Pending
            }
        }
    }
}

/// Probe `url` until it stops looking unprovisioned, or time out
pub fn watch_provisioning(
    probe: EdgeProbe,
    url: Url,
    signal: Arc<dyn ProvisioningSignal>,
    options: PollOptions,
) -> PollHandle<()> {
    poller::spawn(
        options,
        move || {
            let probe = probe.clone();
            let url = url.clone();
            async move { probe.probe(&url).await }
        },
        EdgeClassifier::new(signal),
    )
}
