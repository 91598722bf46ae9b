//! Deployment configuration and merging

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::RunnerError;

/// Environment a deployment targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetEnvironment {
    #[default]
    Production,
    Staging,
}

impl TargetEnvironment {
    /// Production-like deployments are also checked for edge availability
    pub fn is_production_like(&self) -> bool {
        matches!(self, TargetEnvironment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetEnvironment::Production => "production",
            TargetEnvironment::Staging => "staging",
        }
    }
}

impl fmt::Display for TargetEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(TargetEnvironment::Production),
            "staging" => Ok(TargetEnvironment::Staging),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

/// A value that is either shared by every environment or picked per environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopedValue {
    Shared(String),
    PerEnvironment(BTreeMap<TargetEnvironment, String>),
}

impl ScopedValue {
    /// Select the value for `env`; `binding` names the owner in the error
    pub fn resolve(&self, env: TargetEnvironment, binding: &str) -> Result<String, RunnerError> {
        match self {
            ScopedValue::Shared(value) => Ok(value.clone()),
            ScopedValue::PerEnvironment(values) => values.get(&env).cloned().ok_or_else(|| {
                RunnerError::Precondition(format!(
                    "binding \"{}\" has no value for environment \"{}\"",
                    binding, env
                ))
            }),
        }
    }
}

impl From<&str> for ScopedValue {
    fn from(value: &str) -> Self {
        ScopedValue::Shared(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D1Database {
    pub database_id: ScopedValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableObjectNamespace {
    pub namespace_id: ScopedValue,
    /// Only used when running locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvNamespace {
    pub namespace_id: ScopedValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct R2Bucket {
    pub bucket_name: ScopedValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub service: ScopedValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<ScopedValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueProducer {
    pub queue_name: ScopedValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsDataset {
    pub dataset: ScopedValue,
}

/// Environment variables and resource bindings for one deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub d1_databases: BTreeMap<String, D1Database>,
    #[serde(default)]
    pub durable_object_namespaces: BTreeMap<String, DurableObjectNamespace>,
    #[serde(default)]
    pub kv_namespaces: BTreeMap<String, KvNamespace>,
    #[serde(default)]
    pub r2_buckets: BTreeMap<String, R2Bucket>,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
    #[serde(default)]
    pub queue_producers: BTreeMap<String, QueueProducer>,
    #[serde(default)]
    pub analytics_engine_datasets: BTreeMap<String, AnalyticsDataset>,
}

impl DeploymentConfig {
    /// Overlay `other` onto `self`. On key collision `other` wins, per category.
    pub fn merge_with(&mut self, other: &DeploymentConfig) {
        overlay(&mut self.env_vars, &other.env_vars);
        overlay(&mut self.d1_databases, &other.d1_databases);
        overlay(&mut self.durable_object_namespaces, &other.durable_object_namespaces);
        overlay(&mut self.kv_namespaces, &other.kv_namespaces);
        overlay(&mut self.r2_buckets, &other.r2_buckets);
        overlay(&mut self.services, &other.services);
        overlay(&mut self.queue_producers, &other.queue_producers);
        overlay(&mut self.analytics_engine_datasets, &other.analytics_engine_datasets);
    }

    /// Merge configs in order; later configs win
    pub fn merged<'a>(configs: impl IntoIterator<Item = &'a DeploymentConfig>) -> DeploymentConfig {
        configs.into_iter().fold(DeploymentConfig::default(), |mut acc, config| {
            acc.merge_with(config);
            acc
        })
    }

    /// Total number of bindings across all categories, env vars included
    pub fn binding_count(&self) -> usize {
        self.env_vars.len()
            + self.d1_databases.len()
            + self.durable_object_namespaces.len()
            + self.kv_namespaces.len()
            + self.r2_buckets.len()
            + self.services.len()
            + self.queue_producers.len()
            + self.analytics_engine_datasets.len()
    }
}

fn overlay<V: Clone>(base: &mut BTreeMap<String, V>, other: &BTreeMap<String, V>) {
    for (key, value) in other {
        base.insert(key.clone(), value.clone());
    }
}
