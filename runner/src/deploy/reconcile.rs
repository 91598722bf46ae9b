//! Remote project reconciliation
//!
//! The preview deployment config is always written as a full replacement:
//! every binding the project has remotely but the desired config lacks is
//! sent as `null`, so after a successful write the remote set is exactly
//! the desired set. The write is then read back and checked entry by entry.

use std::collections::BTreeMap;

use platform_api::{
    AnalyticsDatasetBinding, BindingMap, BucketBinding, BuildConfig, D1Binding, DeploymentConfigPatch,
    DeploymentConfigsUpdate, EnvVarBinding, NamespaceBinding, ProjectUpdate, QueueProducerBinding,
    RemoteDeploymentConfig, RemoteProject, ServiceBinding,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::deployment::{DeploymentConfig, TargetEnvironment};
use crate::errors::RunnerError;
use crate::http::client::PlatformClient;

/// Desired bindings in their remote representation for one environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredBindings {
    pub env_vars: BTreeMap<String, EnvVarBinding>,
    pub d1_databases: BTreeMap<String, D1Binding>,
    pub durable_object_namespaces: BTreeMap<String, NamespaceBinding>,
    pub kv_namespaces: BTreeMap<String, NamespaceBinding>,
    pub r2_buckets: BTreeMap<String, BucketBinding>,
    pub services: BTreeMap<String, ServiceBinding>,
    pub queue_producers: BTreeMap<String, QueueProducerBinding>,
    pub analytics_engine_datasets: BTreeMap<String, AnalyticsDatasetBinding>,
}

impl DesiredBindings {
    /// Select environment-specific values and map them to remote shapes
    pub fn resolve(config: &DeploymentConfig, env: TargetEnvironment) -> Result<Self, RunnerError> {
        Ok(Self {
            env_vars: config
                .env_vars
                .iter()
                .map(|(name, value)| (name.clone(), EnvVarBinding::plain_text(value)))
                .collect(),
            d1_databases: resolve_each(&config.d1_databases, |name, db| {
                Ok(D1Binding {
                    id: db.database_id.resolve(env, name)?,
                })
            })?,
            durable_object_namespaces: resolve_each(&config.durable_object_namespaces, |name, ns| {
                Ok(NamespaceBinding {
                    namespace_id: ns.namespace_id.resolve(env, name)?,
                })
            })?,
            kv_namespaces: resolve_each(&config.kv_namespaces, |name, ns| {
                Ok(NamespaceBinding {
                    namespace_id: ns.namespace_id.resolve(env, name)?,
                })
            })?,
            r2_buckets: resolve_each(&config.r2_buckets, |name, bucket| {
                Ok(BucketBinding {
                    name: bucket.bucket_name.resolve(env, name)?,
                })
            })?,
            services: resolve_each(&config.services, |name, service| {
                Ok(ServiceBinding {
                    service: service.service.resolve(env, name)?,
                    environment: service
                        .environment
                        .as_ref()
                        .map(|value| value.resolve(env, name))
                        .transpose()?,
                })
            })?,
            queue_producers: resolve_each(&config.queue_producers, |name, queue| {
                Ok(QueueProducerBinding {
                    name: queue.queue_name.resolve(env, name)?,
                })
            })?,
            analytics_engine_datasets: resolve_each(&config.analytics_engine_datasets, |name, dataset| {
                Ok(AnalyticsDatasetBinding {
                    dataset: dataset.dataset.resolve(env, name)?,
                })
            })?,
        })
    }
}

fn resolve_each<L, R, F>(bindings: &BTreeMap<String, L>, resolve: F) -> Result<BTreeMap<String, R>, RunnerError>
where
    F: Fn(&str, &L) -> Result<R, RunnerError>,
{
    bindings
        .iter()
        .map(|(name, local)| Ok((name.clone(), resolve(name, local)?)))
        .collect()
}

/// Replacement set for one binding category.
///
/// Remote keys map to `None` (delete) unless the desired config has them.
pub fn compute_category_patch<'a, V: Clone>(
    remote_keys: impl IntoIterator<Item = &'a String>,
    desired: &BTreeMap<String, V>,
) -> BTreeMap<String, Option<V>> {
    let mut patch: BTreeMap<String, Option<V>> =
        remote_keys.into_iter().map(|key| (key.clone(), None)).collect();
    for (key, value) in desired {
        patch.insert(key.clone(), Some(value.clone()));
    }
    patch
}

/// Build the partial update that makes `remote` match the desired state
pub fn build_update(remote: &RemoteProject, build: &BuildConfig, desired: &DesiredBindings) -> ProjectUpdate {
    let current = &remote.deployment_configs.preview;
    ProjectUpdate {
        build_config: build.clone(),
        deployment_configs: DeploymentConfigsUpdate {
            preview: DeploymentConfigPatch {
                env_vars: compute_category_patch(current.env_vars.keys(), &desired.env_vars),
                d1_databases: compute_category_patch(current.d1_databases.keys(), &desired.d1_databases),
                durable_object_namespaces: compute_category_patch(
                    current.durable_object_namespaces.keys(),
                    &desired.durable_object_namespaces,
                ),
                kv_namespaces: compute_category_patch(current.kv_namespaces.keys(), &desired.kv_namespaces),
                r2_buckets: compute_category_patch(current.r2_buckets.keys(), &desired.r2_buckets),
                services: compute_category_patch(current.services.keys(), &desired.services),
                queue_producers: compute_category_patch(current.queue_producers.keys(), &desired.queue_producers),
                analytics_engine_datasets: compute_category_patch(
                    current.analytics_engine_datasets.keys(),
                    &desired.analytics_engine_datasets,
                ),
            },
        },
    }
}

/// Check a project read back after an update against the desired state
pub fn verify(project: &RemoteProject, build: &BuildConfig, desired: &DesiredBindings) -> Result<(), RunnerError> {
    verify_field("build_config.build_command", &build.build_command, &project.build_config.build_command)?;
    verify_field(
        "build_config.destination_dir",
        &build.destination_dir,
        &project.build_config.destination_dir,
    )?;
    verify_field("build_config.root_dir", &build.root_dir, &project.build_config.root_dir)?;

    let preview: &RemoteDeploymentConfig = &project.deployment_configs.preview;
    verify_category("env_vars", &desired.env_vars, &preview.env_vars)?;
    verify_category("d1_databases", &desired.d1_databases, &preview.d1_databases)?;
    verify_category(
        "durable_object_namespaces",
        &desired.durable_object_namespaces,
        &preview.durable_object_namespaces,
    )?;
    verify_category("kv_namespaces", &desired.kv_namespaces, &preview.kv_namespaces)?;
    verify_category("r2_buckets", &desired.r2_buckets, &preview.r2_buckets)?;
    verify_category("services", &desired.services, &preview.services)?;
    verify_category("queue_producers", &desired.queue_producers, &preview.queue_producers)?;
    verify_category(
        "analytics_engine_datasets",
        &desired.analytics_engine_datasets,
        &preview.analytics_engine_datasets,
    )?;
    Ok(())
}

fn verify_field(field: &str, expected: &Option<String>, actual: &Option<String>) -> Result<(), RunnerError> {
    if expected == actual {
        return Ok(());
    }
    Err(RunnerError::Verification {
        field: field.to_string(),
        expected: serde_json::to_string(expected)?,
        actual: serde_json::to_string(actual)?,
    })
}

/// Ordered comparison: a reordered, added or missing entry all fail
fn verify_category<V: Serialize>(
    category: &str,
    desired: &BTreeMap<String, V>,
    actual: &BindingMap,
) -> Result<(), RunnerError> {
    let expected = desired
        .iter()
        .map(|(key, value)| Ok((key.clone(), serde_json::to_value(value)?)))
        .collect::<Result<Vec<(String, Value)>, serde_json::Error>>()?;
    let actual: Vec<(String, Value)> = actual.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

    if expected == actual {
        return Ok(());
    }
    Err(RunnerError::Verification {
        field: format!("deployment_configs.preview.{}", category),
        expected: entries_to_string(expected),
        actual: entries_to_string(actual),
    })
}

fn entries_to_string(entries: Vec<(String, Value)>) -> String {
    Value::Object(entries.into_iter().collect::<Map<String, Value>>()).to_string()
}

/// Make the remote project match `config` for `env`.
///
/// Callers must hold the project's lock; the read-merge-write is not atomic remotely.
pub async fn reconcile(
    client: &PlatformClient,
    env: TargetEnvironment,
    build: &BuildConfig,
    config: &DeploymentConfig,
) -> Result<RemoteProject, RunnerError> {
    let desired = DesiredBindings::resolve(config, env)?;

    let remote = client.get_project().await?;
    debug!("Fetched project {}", remote.name);

    let update = build_update(&remote, build, &desired);
    let updated = client.update_project(&update).await?;

    verify(&updated, build, &desired)?;
    info!(
        "Project {} reconciled for {} ({} bindings)",
        updated.name,
        env,
        config.binding_count()
    );
    Ok(updated)
}
