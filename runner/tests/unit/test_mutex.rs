use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edgeship::config::deployment::{DeploymentConfig, TargetEnvironment};
use edgeship::deploy::mutex::{mutex_key, with_lock, Lease, LocalMutex, MutexTransport};
use edgeship::deploy::reconcile::reconcile;
use edgeship::errors::RunnerError;
use platform_api::BuildConfig;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, empty_build, envelope, project, EventLog, Recording, PROJECT_PATH};

/// Local mutex that records when leases are taken and given back
struct RecordingMutex {
    inner: LocalMutex,
    log: EventLog,
}

#[async_trait]
impl MutexTransport for RecordingMutex {
    async fn acquire(&self, key: &str) -> Result<Lease, RunnerError> {
        let lease = self.inner.acquire(key).await?;
        self.log.push("acquire");
        Ok(lease)
    }

    async fn release(&self, lease: Lease) -> Result<(), RunnerError> {
        self.log.push("release");
        self.inner.release(lease).await
    }
}

/// Every event between an acquire and its release belongs to one holder
fn assert_serialized(events: &[String]) {
    let mut held = false;
    for event in events {
        match event.as_str() {
            "acquire" => {
                assert!(!held, "lock acquired twice: {events:?}");
                held = true;
            }
            "release" => {
                assert!(held, "release without acquire: {events:?}");
                held = false;
            }
            _ => assert!(held, "{event} outside the lock: {events:?}"),
        }
    }
    assert!(!held);
}

#[tokio::test]
async fn test_critical_sections_do_not_overlap() {
    let log = EventLog::default();
    let mutex = Arc::new(RecordingMutex {
        inner: LocalMutex::new(),
        log: log.clone(),
    });
    let key = mutex_key("api.example", "acc", "site");

    let tasks: Vec<_> = (0..3)
        .map(|i| {
            let mutex = mutex.clone();
            let log = log.clone();
            let key = key.clone();
            tokio::spawn(async move {
                with_lock(mutex.as_ref(), &key, || async {
                    log.push(format!("start-{i}"));
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    log.push(format!("end-{i}"));
                    Ok::<_, RunnerError>(i)
                })
                .await
            })
        })
        .collect();
    for task in tasks {
        assert_ok!(task.await.unwrap());
    }

    let events = log.events();
    assert_eq!(events.len(), 12);
    assert_serialized(&events);
    assert_eq!(mutex.inner.held_count().await, 0);
}

#[tokio::test]
async fn test_distinct_keys_do_not_block() {
    let mutex = LocalMutex::new();
    let first = assert_ok!(mutex.acquire(&mutex_key("api.example", "acc", "one")).await);
    let second = tokio::time::timeout(
        Duration::from_secs(1),
        mutex.acquire(&mutex_key("api.example", "acc", "two")),
    )
    .await;
    let second = assert_ok!(assert_ok!(second));
    assert_eq!(mutex.held_count().await, 2);

    assert_ok!(mutex.release(first).await);
    assert_ok!(mutex.release(second).await);
}

#[tokio::test]
async fn test_concurrent_reconciles_fetch_inside_the_lock() {
    let server = MockServer::start().await;
    let log = EventLog::default();
    let reconciled = envelope(project(empty_build(), json!({})));

    Mock::given(method("GET"))
        .and(path(PROJECT_PATH))
        .respond_with(Recording {
            log: log.clone(),
            event: "fetch",
            response: ResponseTemplate::new(200)
                .set_body_json(reconciled.clone())
                .set_delay(Duration::from_millis(30)),
        })
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(PROJECT_PATH))
        .respond_with(Recording {
            log: log.clone(),
            event: "update",
            response: ResponseTemplate::new(200).set_body_json(reconciled),
        })
        .expect(2)
        .mount(&server)
        .await;

    let mutex = Arc::new(RecordingMutex {
        inner: LocalMutex::new(),
        log: log.clone(),
    });
    let client = client(&server.uri());
    let key = mutex_key(&client.api_host().unwrap(), "acc", "site");
    let build = BuildConfig::default();
    let config = DeploymentConfig::default();

    let (mutex, client, key, build, config) = (mutex.as_ref(), client.as_ref(), &key, &build, &config);
    let attempt = move || async move {
        with_lock(mutex, key, || reconcile(client, TargetEnvironment::Production, build, config)).await
    };
    let (a, b) = tokio::join!(attempt(), attempt());
    assert_ok!(a);
    assert_ok!(b);

    let events = log.events();
    assert_eq!(
        events,
        vec!["acquire", "fetch", "update", "release", "acquire", "fetch", "update", "release"]
    );
    assert_serialized(&events);
}
