//! Bounded retries with exponential backoff for transient store failures.

use std::thread;
use std::time::Duration;

use planforge_config::StoreConfig;
use planforge_core::Result;
use tracing::warn;

use crate::metadata::ModelMetadata;
use crate::traits::{ModelStore, StoredModel};

/// How often and how patiently to retry a failed store operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            multiplier: config.backoff_multiplier,
            max_backoff: config.max_backoff(),
        }
    }

    /// A policy that tries once.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry.min(64) as i32);
        let secs = self.initial_backoff.as_secs_f64() * factor;
        let capped = secs.min(self.max_backoff.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_backoff)
    }

    /// Runs `op`, retrying retryable errors until attempts run out.
    pub fn run<T>(&self, operation: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.attempts => {
                    let delay = self.backoff(attempt - 1);
                    warn!(
                        event = "store_retry",
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Wraps a store so every operation is retried per a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ModelStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<S: ModelStore> ModelStore for RetryingStore<S> {
    fn save(&self, metadata: ModelMetadata, blob: &[u8]) -> Result<ModelMetadata> {
        self.policy
            .run("save", || self.inner.save(metadata.clone(), blob))
    }

    fn load(&self, model_id: &str) -> Result<StoredModel> {
        self.policy.run("load", || self.inner.load(model_id))
    }

    fn load_version(&self, model_id: &str, version: u32) -> Result<StoredModel> {
        self.policy
            .run("load_version", || self.inner.load_version(model_id, version))
    }

    fn list(&self) -> Result<Vec<ModelMetadata>> {
        self.policy.run("list", || self.inner.list())
    }

    fn versions(&self, model_id: &str) -> Result<Vec<ModelMetadata>> {
        self.policy.run("versions", || self.inner.versions(model_id))
    }

    fn delete(&self, model_id: &str) -> Result<()> {
        self.policy.run("delete", || self.inner.delete(model_id))
    }
}
