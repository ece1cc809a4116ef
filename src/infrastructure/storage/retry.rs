//! Bounded exponential backoff around a blob store
//!
//! Both store calls are idempotent: the store is content-addressed, so a
//! repeated upload resolves to the same id.

use std::future::Future;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tracing::warn;

use crate::application::ports::{BlobStore, StorageError};
use crate::domain::receipt::BlobReceipt;
use crate::domain::recording::AudioData;

pub struct RetryingStore<S: BlobStore> {
    inner: S,
    max_attempts: u32,
    initial_backoff: StdDuration,
}

impl<S: BlobStore> RetryingStore<S> {
    /// `max_attempts` counts the first try; values below 1 are treated as 1
    pub fn new(inner: S, max_attempts: u32, initial_backoff: StdDuration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match call().await {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        operation,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "transient storage failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for RetryingStore<S> {
    async fn upload(&self, blob: &[u8], epochs: u32) -> Result<BlobReceipt, StorageError> {
        self.with_retry("upload", || self.inner.upload(blob, epochs)).await
    }

    async fn fetch(&self, blob_id: &str) -> Result<AudioData, StorageError> {
        self.with_retry("fetch", || self.inner.fetch(blob_id)).await
    }
}
