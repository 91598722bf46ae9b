//! Deployment completion poller

use std::sync::Arc;

use platform_api::{Deployment, StageStatus};
use tracing::{debug, error, warn};

use crate::errors::RunnerError;
use crate::http::client::PlatformClient;
use crate::workers::poller::{self, Classifier, PollHandle, PollOptions, Verdict};

/// The only stage whose success finishes a deployment
pub const DEPLOY_STAGE: &str = "deploy";

/// Classifies deployment status responses.
///
/// Up to `threshold` failed status checks are tolerated; the next one fails the loop.
#[derive(Debug)]
pub struct DeploymentClassifier {
    dashboard_url: String,
    threshold: u32,
    not_ok_responses: u32,
}

impl DeploymentClassifier {
    pub fn new(dashboard_url: impl Into<String>, threshold: u32) -> Self {
        Self {
            dashboard_url: dashboard_url.into(),
            threshold,
            not_ok_responses: 0,
        }
    }

    /// Failed status checks seen so far
    pub fn not_ok_responses(&self) -> u32 {
        self.not_ok_responses
    }

    /// Wrap the last error once the failure budget is spent, keeping status and body
    fn exhausted(&self, err: RunnerError) -> RunnerError {
        let summary = format!(
            "Deployment status check failed {} times (threshold {})",
            self.not_ok_responses, self.threshold
        );
        match err {
            RunnerError::Transport { context, status, body } => RunnerError::Transport {
                context: format!("{}: {}", summary, context),
                status,
                body,
            },
            other => RunnerError::Transport {
                context: summary,
                status: None,
                body: other.to_string(),
            },
        }
    }
}

impl Classifier<Deployment> for DeploymentClassifier {
    type Output = String;

    fn classify(&mut self, observation: Result<Deployment, RunnerError>) -> Verdict<String> {
        let deployment = match observation {
            Ok(deployment) => deployment,
            Err(err) => {
                self.not_ok_responses += 1;
                if self.not_ok_responses > self.threshold {
                    error!(
                        "Deployment status check failed {} times, giving up: {}",
                        self.not_ok_responses, err
                    );
                    return Verdict::Failure(self.exhausted(err));
                }
                warn!(
                    "Deployment status check failed ({}/{}, transient: {}): {}",
                    self.not_ok_responses,
                    self.threshold,
                    err.is_transient(),
                    err
                );
                return Verdict::Pending;
            }
        };

        let stage = &deployment.latest_stage;
        if stage.name == DEPLOY_STAGE && stage.status == StageStatus::Success {
            return Verdict::Success(deployment.url);
        }
        if !stage.status.is_in_progress() {
            return Verdict::Failure(RunnerError::DeploymentFailed {
                stage: stage.name.clone(),
                status: stage.status.to_string(),
                dashboard_url: self.dashboard_url.clone(),
            });
        }

        debug!("Deployment {} at stage {} ({})", deployment.id, stage.name, stage.status);
        Verdict::Pending
    }
}

/// Dashboard page of a deployment
pub fn dashboard_link(dashboard_base: &str, account_id: &str, project_name: &str, deployment_id: &str) -> String {
    format!(
        "{}/{}/pages/view/{}/{}",
        dashboard_base.trim_end_matches('/'),
        account_id,
        project_name,
        deployment_id
    )
}

/// Poll a deployment until it succeeds, fails or times out. Resolves to its URL.
pub fn watch_deployment(
    client: Arc<PlatformClient>,
    deployment_id: String,
    options: PollOptions,
    dashboard_base: &str,
    api_failures_threshold: u32,
) -> PollHandle<String> {
    let dashboard_url = dashboard_link(
        dashboard_base,
        client.account_id(),
        client.project_name(),
        &deployment_id,
    );
    let classifier = DeploymentClassifier::new(dashboard_url, api_failures_threshold);

    poller::spawn(
        options,
        move || {
            let client = client.clone();
            let deployment_id = deployment_id.clone();
            async move { client.get_deployment(&deployment_id).await }
        },
        classifier,
    )
}
