use std::path::PathBuf;

use edgeship::config::deployment::TargetEnvironment;
use edgeship::config::features::FeatureCatalog;
use edgeship::config::fixture::Fixture;
use edgeship::deploy::reconcile::DesiredBindings;
use edgeship::errors::RunnerError;
use edgeship::storage::settings::Settings;
use edgeship::utils::generate_uuid;
use tokio_test::{assert_err, assert_ok};

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("edgeship-test-{}", generate_uuid()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.0.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[tokio::test]
async fn test_fixture_features_merge_in_listed_order() {
    let dir = TempDir::new();
    let fixture_path = dir.write(
        "fixture.json",
        r#"{
            "name": "kv-site",
            "site_dir": "public",
            "build": {"command": "npm run build", "output_dir": "dist"},
            "features": ["kv", "override"],
            "config": {
                "envVars": {"MODE": "fixture", "KEEP": "yes"},
                "kvNamespaces": {"CACHE": {"namespace_id": "fixture-ns"}}
            }
        }"#,
    );
    let features_path = dir.write(
        "features.json",
        r#"{
            "kv": {
                "envVars": {"MODE": "kv"},
                "kvNamespaces": {"CACHE": {"namespace_id": {"production": "prod-ns", "staging": "stg-ns"}}}
            },
            "override": {"envVars": {"MODE": "override"}}
        }"#,
    );

    let fixture = assert_ok!(Fixture::load(&fixture_path).await);
    let catalog = assert_ok!(FeatureCatalog::load(&features_path).await);
    assert_eq!(fixture.site_path(), dir.0.join("public"));
    assert_eq!(fixture.build.to_remote().destination_dir.as_deref(), Some("dist"));

    let config = assert_ok!(fixture.deployment_config(&catalog));
    assert_eq!(config.env_vars["MODE"], "override");
    assert_eq!(config.env_vars["KEEP"], "yes");

    let production = assert_ok!(DesiredBindings::resolve(&config, TargetEnvironment::Production));
    assert_eq!(production.kv_namespaces["CACHE"].namespace_id, "prod-ns");
    let staging = assert_ok!(DesiredBindings::resolve(&config, TargetEnvironment::Staging));
    assert_eq!(staging.kv_namespaces["CACHE"].namespace_id, "stg-ns");
}

#[tokio::test]
async fn test_malformed_fixture_is_config_error() {
    let dir = TempDir::new();
    let path = dir.write("fixture.json", "{ not json");
    let err = assert_err!(Fixture::load(&path).await);
    assert!(matches!(err, RunnerError::ConfigError(_)));
}

#[tokio::test]
async fn test_missing_fixture_is_config_error() {
    let dir = TempDir::new();
    let err = assert_err!(Fixture::load(dir.0.join("absent.json")).await);
    assert!(matches!(err, RunnerError::ConfigError(_)));
}

#[tokio::test]
async fn test_settings_file_defaults() {
    let dir = TempDir::new();
    let path = dir.write(
        "edgeship.json",
        r#"{"environment": "staging", "polling": {"deployment_check_interval_ms": 1000}}"#,
    );

    let settings = assert_ok!(Settings::load(&path).await);
    assert_eq!(settings.environment, TargetEnvironment::Staging);
    assert_eq!(settings.polling.deployment_check_interval_ms, 1000);
    assert_eq!(settings.polling.deployment_timeout_ms, 600_000);
    assert_eq!(settings.polling.deployment_check_api_failures_threshold, 5);
    assert_eq!(settings.polling.provisioner_check_interval_ms, 2_000);
    assert_eq!(settings.edge.not_provisioned_statuses, vec![404]);
}

#[tokio::test]
async fn test_settings_file_rejects_zero_interval() {
    let dir = TempDir::new();
    let path = dir.write("edgeship.json", r#"{"polling": {"deployment_check_interval_ms": 0}}"#);

    let err = assert_err!(Settings::load(&path).await);
    match err {
        RunnerError::ConfigError(message) => assert!(message.contains("deployment_check_interval_ms")),
        other => panic!("unexpected error: {other}"),
    }
}
