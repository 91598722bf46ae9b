//! Mutual exclusion for project reconfiguration

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error};

use crate::errors::RunnerError;
use crate::utils::{generate_uuid, sha256_hash};

/// A held lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub key: String,
    pub id: String,
}

/// Lock service used to serialize writers of the same remote project
#[async_trait]
pub trait MutexTransport: Send + Sync {
    /// Wait until `key` is free and take it
    async fn acquire(&self, key: &str) -> Result<Lease, RunnerError>;

    /// Give a lease back
    async fn release(&self, lease: Lease) -> Result<(), RunnerError>;
}

/// Lock key for a project on a given API host and account
pub fn mutex_key(api_host: &str, account_id: &str, project_name: &str) -> String {
    let digest = sha256_hash(format!("{}/{}/{}", api_host, account_id, project_name).as_bytes());
    format!("deploy-lock-{}", &digest[..32])
}

/// Run `critical` while holding `key`.
///
/// Release failures are logged and never replace the critical section's result.
pub async fn with_lock<T, F, Fut>(transport: &dyn MutexTransport, key: &str, critical: F) -> Result<T, RunnerError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, RunnerError>>,
{
    let lease = transport.acquire(key).await?;
    debug!("Acquired lock {} (lease {})", lease.key, lease.id);

    let result = critical().await;

    let lease_id = lease.id.clone();
    match transport.release(lease).await {
        Ok(()) => debug!("Released lock {} (lease {})", key, lease_id),
        Err(e) => error!("Failed to release lock {} (lease {}): {}", key, lease_id, e),
    }

    result
}

/// In-process lock service, one async mutex per key
#[derive(Default)]
pub struct LocalMutex {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    held: Mutex<HashMap<String, OwnedMutexGuard<()>>>,
}

impl LocalMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leases currently held
    pub async fn held_count(&self) -> usize {
        self.held.lock().await.len()
    }
}

#[async_trait]
impl MutexTransport for LocalMutex {
    async fn acquire(&self, key: &str) -> Result<Lease, RunnerError> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;

        let lease = Lease {
            key: key.to_string(),
            id: generate_uuid(),
        };
        self.held.lock().await.insert(lease.id.clone(), guard);
        Ok(lease)
    }

    async fn release(&self, lease: Lease) -> Result<(), RunnerError> {
        match self.held.lock().await.remove(&lease.id) {
            Some(_guard) => Ok(()),
            None => Err(RunnerError::MutexError(format!(
                "lease {} for {} is not held",
                lease.id, lease.key
            ))),
        }
    }
}
