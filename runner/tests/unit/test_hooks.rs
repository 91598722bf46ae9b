use edgeship::deploy::hooks::{create_deploy_hook, fire_deploy_hook};
use edgeship::deploy::teardown::Teardown;
use edgeship::errors::RunnerError;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, envelope, PROJECT_PATH};

#[tokio::test]
async fn test_created_hook_is_deleted_on_teardown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/deploy_hooks", PROJECT_PATH)))
        .and(body_json(json!({"name": "edgeship-kv-1234", "branch": "edgeship-kv-1234"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "hook_id": "hook-1",
            "name": "edgeship-kv-1234",
            "branch": "edgeship-kv-1234"
        }))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/deploy_hooks/hook-1", PROJECT_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(null))))
        .expect(1)
        .mount(&server)
        .await;

    let teardown = Teardown::new();
    let hook_id = assert_ok!(create_deploy_hook(client(&server.uri()), "edgeship-kv-1234", &teardown).await);
    assert_eq!(hook_id, "hook-1");
    assert_eq!(teardown.pending().await, vec!["delete deploy hook hook-1".to_string()]);

    assert_eq!(teardown.run().await, 0);
    assert!(teardown.pending().await.is_empty());
    // A second run has nothing left to delete
    assert_eq!(teardown.run().await, 0);
}

#[tokio::test]
async fn test_missing_hook_id_registers_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/deploy_hooks", PROJECT_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({"hook_id": ""}))))
        .mount(&server)
        .await;

    let teardown = Teardown::new();
    let err = assert_err!(create_deploy_hook(client(&server.uri()), "branch", &teardown).await);
    assert!(matches!(err, RunnerError::Transport { .. }));
    assert!(teardown.pending().await.is_empty());
}

#[tokio::test]
async fn test_failed_delete_is_counted_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/deploy_hooks", PROJECT_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({"hook_id": "hook-2"}))))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/deploy_hooks/hook-2", PROJECT_PATH)))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let teardown = Teardown::new();
    assert_ok!(create_deploy_hook(client(&server.uri()), "branch", &teardown).await);
    assert_eq!(teardown.run().await, 1);
}

#[tokio::test]
async fn test_fire_returns_deployment_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pages/webhooks/deploy_hooks/hook-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({"id": "dep-42"}))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server.uri());
    let deployment_id = assert_ok!(fire_deploy_hook(&client, "hook-1").await);
    assert_eq!(deployment_id, "dep-42");
}

#[tokio::test]
async fn test_fire_without_id_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pages/webhooks/deploy_hooks/hook-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({"id": ""}))))
        .mount(&server)
        .await;

    let client = client(&server.uri());
    assert_err!(fire_deploy_hook(&client, "hook-1").await);
}
