//! Deploy hook API client

use platform_api::{CreateDeployHookRequest, DeployHook, TriggeredDeployment};
use reqwest::Method;

use crate::errors::RunnerError;
use crate::http::client::PlatformClient;

impl PlatformClient {
    /// Create a deploy hook bound to `branch`
    pub async fn create_deploy_hook(&self, branch: &str) -> Result<DeployHook, RunnerError> {
        let path = format!("{}/deploy_hooks", self.project_path());
        let body = CreateDeployHookRequest {
            name: branch.to_string(),
            branch: branch.to_string(),
        };
        self.request(Method::POST, &path, Some(&body), "Failed to create deploy hook")
            .await
    }

    /// Delete a deploy hook
    pub async fn delete_deploy_hook(&self, hook_id: &str) -> Result<(), RunnerError> {
        let path = format!("{}/deploy_hooks/{}", self.project_path(), hook_id);
        self.request_status(Method::DELETE, &path, "Failed to delete deploy hook")
            .await
    }

    /// Fire a deploy hook, starting a deployment
    pub async fn fire_deploy_hook(&self, hook_id: &str) -> Result<TriggeredDeployment, RunnerError> {
        let path = format!("/pages/webhooks/deploy_hooks/{}", hook_id);
        self.request::<TriggeredDeployment, ()>(Method::POST, &path, None, "Failed to fire deploy hook")
            .await
    }
}
