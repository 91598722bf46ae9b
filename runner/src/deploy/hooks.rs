//! Deploy hook lifecycle

use std::sync::Arc;

use tracing::info;

use crate::deploy::teardown::Teardown;
use crate::errors::RunnerError;
use crate::http::client::PlatformClient;

/// Create a deploy hook for `branch` and register its deletion
pub async fn create_deploy_hook(
    client: Arc<PlatformClient>,
    branch: &str,
    teardown: &Teardown,
) -> Result<String, RunnerError> {
    let hook = client.create_deploy_hook(branch).await?;
    if hook.hook_id.is_empty() {
        return Err(RunnerError::Transport {
            context: "Failed to create deploy hook: empty hook_id".to_string(),
            status: None,
            body: String::new(),
        });
    }
    info!("Created deploy hook {} for branch {}", hook.hook_id, branch);

    let hook_id = hook.hook_id.clone();
    teardown
        .register(format!("delete deploy hook {}", hook_id), move || async move {
            client.delete_deploy_hook(&hook_id).await
        })
        .await;

    Ok(hook.hook_id)
}

/// Fire a deploy hook and return the id of the deployment it started
pub async fn fire_deploy_hook(client: &PlatformClient, hook_id: &str) -> Result<String, RunnerError> {
    let deployment = client.fire_deploy_hook(hook_id).await?;
    if deployment.id.is_empty() {
        return Err(RunnerError::Transport {
            context: "Failed to fire deploy hook: empty deployment id".to_string(),
            status: None,
            body: String::new(),
        });
    }
    info!("Deploy hook {} started deployment {}", hook_id, deployment.id);
    Ok(deployment.id)
}
