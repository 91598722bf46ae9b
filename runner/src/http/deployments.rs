//! Deployment API client

use platform_api::Deployment;
use reqwest::Method;

use crate::errors::RunnerError;
use crate::http::client::PlatformClient;

impl PlatformClient {
    /// Get the current state of a deployment
    pub async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, RunnerError> {
        let path = format!("{}/deployments/{}", self.project_path(), deployment_id);
        self.request::<Deployment, ()>(Method::GET, &path, None, "Failed to fetch deployment")
            .await
    }
}
