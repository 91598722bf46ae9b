//! Compensating actions run after a deployment run

use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::errors::RunnerError;

pub type TeardownFuture = Pin<Box<dyn Future<Output = Result<(), RunnerError>> + Send>>;

type TeardownAction = Box<dyn FnOnce() -> TeardownFuture + Send>;

/// Ordered registry of named compensating actions
#[derive(Default)]
pub struct Teardown {
    actions: Mutex<Vec<(String, TeardownAction)>>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action to run at teardown
    pub async fn register<F, Fut>(&self, name: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), RunnerError>> + Send + 'static,
    {
        let name = name.into();
        info!("Registered teardown: {}", name);
        let action: TeardownAction = Box::new(move || Box::pin(action()));
        self.actions.lock().await.push((name, action));
    }

    /// Names of pending actions, in registration order
    pub async fn pending(&self) -> Vec<String> {
        self.actions
            .lock()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Run every pending action, most recent first. Returns the number that failed.
    pub async fn run(&self) -> usize {
        let actions = std::mem::take(&mut *self.actions.lock().await);
        let mut failures = 0;

        for (name, action) in actions.into_iter().rev() {
            info!("Running teardown: {}", name);
            if let Err(e) = action().await {
                failures += 1;
                error!("Teardown \"{}\" failed: {}", name, e);
            }
        }

        failures
    }
}
