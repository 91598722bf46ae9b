//! Deployment run orchestration

use std::future::Future;

use chrono::Utc;
use platform_api::BuildConfig;
use tracing::{info, warn};
use url::Url;

use crate::app::state::RunContext;
use crate::config::deployment::DeploymentConfig;
use crate::config::features::FeatureCatalog;
use crate::config::fixture::Fixture;
use crate::deploy::git::{self, branch_name};
use crate::deploy::hooks::{create_deploy_hook, fire_deploy_hook};
use crate::deploy::mutex::{mutex_key, with_lock};
use crate::deploy::reconcile::{reconcile, DesiredBindings};
use crate::deploy::teardown::Teardown;
use crate::errors::RunnerError;
use crate::utils::generate_uuid;
use crate::workers::deployment::watch_deployment;
use crate::workers::provisioner::watch_provisioning;

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedSite {
    pub url: String,
}

/// Deploy a fixture end to end.
///
/// Teardown actions are registered on `context.teardown` as the run goes;
/// the caller runs them whatever the outcome.
pub async fn deploy_fixture(
    context: &RunContext,
    fixture: &Fixture,
    catalog: &FeatureCatalog,
) -> Result<DeployedSite, RunnerError> {
    let environment = context.options.environment;
    info!("Deploying fixture \"{}\" to {}", fixture.name, environment);

    // Fail fast before any remote call
    let config = fixture.deployment_config(catalog)?;
    DesiredBindings::resolve(&config, environment)?;
    let repo_url = context
        .git
        .repo_url
        .as_deref()
        .ok_or_else(|| RunnerError::Precondition("no git repository configured".to_string()))?;

    let branch = branch_name(&context.git.branch_prefix, &fixture.name, &generate_uuid());
    git::publish_branch(
        &fixture.site_path(),
        repo_url,
        &branch,
        &context.commit_author(),
        Utc::now(),
        &context.teardown,
    )
    .await?;

    let build = fixture.build.to_remote();
    let deployment_id = trigger_deployment(context, &branch, &build, &config).await?;
    let url = await_deployment(context, deployment_id).await?;

    Ok(DeployedSite { url })
}

/// Create a deploy hook for `branch`, then reconfigure the project and fire
/// the hook while holding the project's lock. Returns the deployment id.
pub async fn trigger_deployment(
    context: &RunContext,
    branch: &str,
    build: &BuildConfig,
    config: &DeploymentConfig,
) -> Result<String, RunnerError> {
    let hook_id = create_deploy_hook(context.client.clone(), branch, &context.teardown).await?;

    let client = context.client.as_ref();
    let key = mutex_key(&client.api_host()?, client.account_id(), client.project_name());
    let environment = context.options.environment;

    with_lock(context.mutex.as_ref(), &key, || async {
        reconcile(client, environment, build, config).await?;
        fire_deploy_hook(client, &hook_id).await
    })
    .await
}

/// Wait for a deployment to finish, then for production-like environments
/// wait for it to be served at the edge. Returns the deployment URL.
pub async fn await_deployment(context: &RunContext, deployment_id: String) -> Result<String, RunnerError> {
    let options = &context.options;

    let mut deployment = watch_deployment(
        context.client.clone(),
        deployment_id.clone(),
        options.deployment.poll_options(),
        &options.dashboard_url,
        options.deployment.api_failures_threshold,
    );
    let url = deployment.outcome().await?;
    info!("Deployment {} finished: {}", deployment_id, url);

    if !options.environment.is_production_like() {
        return Ok(url);
    }

    let parsed = Url::parse(&url).map_err(|e| {
        warn!("Deployment {} reported an invalid URL: {}", deployment_id, url);
        RunnerError::UrlError(e)
    })?;
    let mut provisioning = watch_provisioning(
        context.edge_probe.clone(),
        parsed,
        context.signal.clone(),
        options.provisioner.poll_options(),
    );
    provisioning.outcome().await?;
    info!("Deployment {} is served at {}", deployment_id, url);

    Ok(url)
}

/// Drive `run` until it finishes or `shutdown` resolves, then run teardown either way.
///
/// An interrupted run is dropped mid-flight and reported as `Cancelled`.
pub async fn run_with_teardown<T, R, S>(teardown: &Teardown, run: R, shutdown: S) -> Result<T, RunnerError>
where
    R: Future<Output = Result<T, RunnerError>>,
    S: Future<Output = ()>,
{
    let result = tokio::select! {
        result = run => result,
        _ = shutdown => {
            warn!("Run interrupted, tearing down");
            Err(RunnerError::Cancelled("run interrupted by shutdown signal".to_string()))
        }
    };

    let failed = teardown.run().await;
    if failed > 0 {
        warn!("{} teardown actions failed", failed);
    }

    result
}
