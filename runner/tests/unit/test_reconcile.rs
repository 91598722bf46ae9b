use edgeship::config::deployment::{DeploymentConfig, KvNamespace, ScopedValue, TargetEnvironment};
use edgeship::deploy::reconcile::reconcile;
use edgeship::errors::RunnerError;
use platform_api::BuildConfig;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, empty_build, envelope, project, PROJECT_PATH};

fn cache_config() -> DeploymentConfig {
    let mut config = DeploymentConfig::default();
    config.env_vars.insert("MODE".to_string(), "kv".to_string());
    config.kv_namespaces.insert(
        "CACHE".to_string(),
        KvNamespace {
            namespace_id: ScopedValue::from("ns-cache"),
        },
    );
    config
}

fn build() -> BuildConfig {
    BuildConfig {
        build_command: Some("npm run build".to_string()),
        destination_dir: Some("dist".to_string()),
        root_dir: None,
    }
}

fn build_json() -> Value {
    json!({"build_command": "npm run build", "destination_dir": "dist", "root_dir": null})
}

fn reconciled_preview() -> Value {
    json!({
        "env_vars": {"MODE": {"type": "plain_text", "value": "kv"}},
        "kv_namespaces": {"CACHE": {"namespace_id": "ns-cache"}}
    })
}

async fn mount_get(server: &MockServer, preview: Value) {
    Mock::given(method("GET"))
        .and(path(PROJECT_PATH))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(project(empty_build(), preview))))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_reconcile_replaces_remote_bindings() {
    let server = MockServer::start().await;
    mount_get(&server, json!({"kv_namespaces": {"OLD": {"namespace_id": "ns-old"}}})).await;
    Mock::given(method("PATCH"))
        .and(path(PROJECT_PATH))
        .and(body_partial_json(json!({
            "build_config": {"build_command": "npm run build", "destination_dir": "dist"},
            "deployment_configs": {"preview": {
                "env_vars": {"MODE": {"type": "plain_text", "value": "kv"}},
                "kv_namespaces": {"OLD": null, "CACHE": {"namespace_id": "ns-cache"}}
            }}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(project(build_json(), reconciled_preview()))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server.uri());
    let project = assert_ok!(reconcile(&client, TargetEnvironment::Production, &build(), &cache_config()).await);
    let kv = &project.deployment_configs.preview.kv_namespaces;
    assert_eq!(kv.len(), 1);
    assert!(kv.contains_key("CACHE"));

    // Categories absent on both sides are sent as empty replacements
    let requests = server.received_requests().await.unwrap();
    let patch: Value = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap()
        .body_json()
        .unwrap();
    assert_eq!(patch["deployment_configs"]["preview"]["r2_buckets"], json!({}));
}

#[tokio::test]
async fn test_reconcile_is_deterministic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROJECT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(project(empty_build(), json!({})))))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(PROJECT_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(project(build_json(), reconciled_preview()))),
        )
        .mount(&server)
        .await;

    let client = client(&server.uri());
    for _ in 0..2 {
        assert_ok!(reconcile(&client, TargetEnvironment::Production, &build(), &cache_config()).await);
    }

    let bodies: Vec<Vec<u8>> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PATCH")
        .map(|r| r.body)
        .collect();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn test_reconcile_rejects_stale_binding_in_response() {
    let server = MockServer::start().await;
    mount_get(&server, json!({"kv_namespaces": {"OLD": {"namespace_id": "ns-old"}}})).await;
    Mock::given(method("PATCH"))
        .and(path(PROJECT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(project(
            build_json(),
            json!({
                "env_vars": {"MODE": {"type": "plain_text", "value": "kv"}},
                "kv_namespaces": {
                    "CACHE": {"namespace_id": "ns-cache"},
                    "OLD": {"namespace_id": "ns-old"}
                }
            }),
        ))))
        .mount(&server)
        .await;

    let client = client(&server.uri());
    let err = assert_err!(reconcile(&client, TargetEnvironment::Production, &build(), &cache_config()).await);
    match err {
        RunnerError::Verification { field, .. } => assert_eq!(field, "deployment_configs.preview.kv_namespaces"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_reconcile_rejects_build_config_mismatch() {
    let server = MockServer::start().await;
    mount_get(&server, json!({})).await;
    Mock::given(method("PATCH"))
        .and(path(PROJECT_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(project(empty_build(), reconciled_preview()))),
        )
        .mount(&server)
        .await;

    let client = client(&server.uri());
    let err = assert_err!(reconcile(&client, TargetEnvironment::Production, &build(), &cache_config()).await);
    match err {
        RunnerError::Verification { field, .. } => assert_eq!(field, "build_config.build_command"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_fetch_without_result_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROJECT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": [{"code": 8000007, "message": "project not found"}],
            "messages": [],
            "result": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(PROJECT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server.uri());
    let err = assert_err!(reconcile(&client, TargetEnvironment::Production, &build(), &cache_config()).await);
    match err {
        RunnerError::Transport { status, body, .. } => {
            assert_eq!(status, Some(200));
            assert!(body.contains("project not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_update_failure_carries_status_and_body() {
    let server = MockServer::start().await;
    mount_get(&server, json!({})).await;
    Mock::given(method("PATCH"))
        .and(path(PROJECT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = client(&server.uri());
    let err = assert_err!(reconcile(&client, TargetEnvironment::Production, &build(), &cache_config()).await);
    match err {
        RunnerError::Transport { status, body, .. } => {
            assert_eq!(status, Some(500));
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unresolved_environment_value_skips_remote_calls() {
    let server = MockServer::start().await;
    let mut config = DeploymentConfig::default();
    config.kv_namespaces.insert(
        "CACHE".to_string(),
        serde_json::from_value(json!({"namespace_id": {"staging": "ns-staging"}})).unwrap(),
    );

    let client = client(&server.uri());
    let err = assert_err!(reconcile(&client, TargetEnvironment::Production, &build(), &config).await);
    assert!(matches!(err, RunnerError::Precondition(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
