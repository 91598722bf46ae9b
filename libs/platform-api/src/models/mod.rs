//! API models

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Remote binding map as returned by the platform, in server order
pub type BindingMap = Map<String, Value>;

/// Standard response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
    pub result: Option<T>,
}

/// Error or informational message attached to an envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

// ============================== PROJECTS ================================== //

/// Remote project as read from the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteProject {
    pub name: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub build_config: BuildConfig,
    #[serde(default)]
    pub deployment_configs: RemoteDeploymentConfigs,
}

/// Build settings of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(default)]
    pub destination_dir: Option<String>,
    #[serde(default)]
    pub root_dir: Option<String>,
}

/// Per-environment deployment configs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteDeploymentConfigs {
    #[serde(default)]
    pub preview: RemoteDeploymentConfig,
    #[serde(default)]
    pub production: Option<RemoteDeploymentConfig>,
}

/// Binding categories of one remote deployment config.
///
/// Absent and `null` categories both read as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteDeploymentConfig {
    #[serde(default, deserialize_with = "nullable_map")]
    pub env_vars: BindingMap,
    #[serde(default, deserialize_with = "nullable_map")]
    pub d1_databases: BindingMap,
    #[serde(default, deserialize_with = "nullable_map")]
    pub durable_object_namespaces: BindingMap,
    #[serde(default, deserialize_with = "nullable_map")]
    pub kv_namespaces: BindingMap,
    #[serde(default, deserialize_with = "nullable_map")]
    pub r2_buckets: BindingMap,
    #[serde(default, deserialize_with = "nullable_map")]
    pub services: BindingMap,
    #[serde(default, deserialize_with = "nullable_map")]
    pub queue_producers: BindingMap,
    #[serde(default, deserialize_with = "nullable_map")]
    pub analytics_engine_datasets: BindingMap,
}

fn nullable_map<'de, D>(deserializer: D) -> Result<BindingMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BindingMap>::deserialize(deserializer)?.unwrap_or_default())
}

/// Partial project update; fields left out are untouched remotely
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectUpdate {
    pub build_config: BuildConfig,
    pub deployment_configs: DeploymentConfigsUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentConfigsUpdate {
    pub preview: DeploymentConfigPatch,
}

/// Full replacement set per category. `None` deletes the binding remotely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeploymentConfigPatch {
    pub env_vars: BTreeMap<String, Option<EnvVarBinding>>,
    pub d1_databases: BTreeMap<String, Option<D1Binding>>,
    pub durable_object_namespaces: BTreeMap<String, Option<NamespaceBinding>>,
    pub kv_namespaces: BTreeMap<String, Option<NamespaceBinding>>,
    pub r2_buckets: BTreeMap<String, Option<BucketBinding>>,
    pub services: BTreeMap<String, Option<ServiceBinding>>,
    pub queue_producers: BTreeMap<String, Option<QueueProducerBinding>>,
    pub analytics_engine_datasets: BTreeMap<String, Option<AnalyticsDatasetBinding>>,
}

// ============================== BINDINGS ================================== //

/// Environment variable value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarBinding {
    #[serde(rename = "type")]
    pub kind: EnvVarKind,
    pub value: String,
}

impl EnvVarBinding {
    pub fn plain_text(value: impl Into<String>) -> Self {
        Self {
            kind: EnvVarKind::PlainText,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvVarKind {
    PlainText,
    SecretText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D1Binding {
    pub id: String,
}

/// KV and durable object namespace binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceBinding {
    pub namespace_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketBinding {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueProducerBinding {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsDatasetBinding {
    pub dataset: String,
}

// ============================ DEPLOY HOOKS ================================ //

/// Deploy hook creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeployHookRequest {
    pub name: String,
    pub branch: String,
}

/// Deploy hook as returned on creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployHook {
    pub hook_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Deployment reference returned when a hook fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredDeployment {
    pub id: String,
}

// ============================= DEPLOYMENTS ================================ //

/// Deployment state as observed by the poller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    #[serde(default)]
    pub url: String,
    pub latest_stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub status: StageStatus,
}

/// Stage status. Unrecognised values read as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Idle,
    Active,
    Canceled,
    Success,
    Failure,
    #[serde(other)]
    Unknown,
}

impl StageStatus {
    /// Statuses that leave the deployment in flight
    pub fn is_in_progress(&self) -> bool {
        matches!(self, StageStatus::Idle | StageStatus::Active | StageStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Idle => "idle",
            StageStatus::Active => "active",
            StageStatus::Canceled => "canceled",
            StageStatus::Success => "success",
            StageStatus::Failure => "failure",
            StageStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
