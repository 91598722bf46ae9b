//! Shared test helpers

use std::sync::{Arc, Mutex};

use edgeship::http::client::PlatformClient;
use edgeship::storage::settings::Settings;
use secrecy::SecretString;
use serde_json::{json, Value};
use wiremock::{Request, Respond, ResponseTemplate};

pub const ACCOUNT: &str = "acc";
pub const PROJECT: &str = "site";
pub const PROJECT_PATH: &str = "/accounts/acc/pages/projects/site";

pub fn client(base_url: &str) -> Arc<PlatformClient> {
    Arc::new(PlatformClient::new(base_url, ACCOUNT, PROJECT, SecretString::from("test-token")).unwrap())
}

/// Settings pointing at a mock server, with fast polling
pub fn settings(base_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.api.base_url = base_url.to_string();
    settings.api.account_id = ACCOUNT.to_string();
    settings.api.project_name = PROJECT.to_string();
    settings.api.dashboard_url = "https://dash.example".to_string();
    settings.api_token = Some(SecretString::from("test-token"));
    settings.polling.deployment_check_interval_ms = 20;
    settings.polling.deployment_timeout_ms = 5_000;
    settings.polling.deployment_check_api_failures_threshold = 2;
    settings.polling.provisioner_check_interval_ms = 20;
    settings.polling.provisioner_timeout_ms = 5_000;
    settings
}

pub fn envelope(result: Value) -> Value {
    json!({"success": true, "errors": [], "messages": [], "result": result})
}

pub fn project(build: Value, preview: Value) -> Value {
    json!({
        "name": PROJECT,
        "subdomain": "site.example",
        "build_config": build,
        "deployment_configs": {"preview": preview, "production": {}}
    })
}

pub fn empty_build() -> Value {
    json!({"build_command": null, "destination_dir": null, "root_dir": null})
}

pub fn deployment(stage: &str, status: &str, url: &str) -> Value {
    json!({"id": "dep-1", "url": url, "latest_stage": {"name": stage, "status": status}})
}

/// Shared ordered event log
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Responder that records each request it answers
pub struct Recording {
    pub log: EventLog,
    pub event: &'static str,
    pub response: ResponseTemplate,
}

impl Respond for Recording {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.log.push(self.event);
        self.response.clone()
    }
}
