//! Blob store port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::receipt::BlobReceipt;
use crate::domain::recording::AudioData;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage write failed ({status}): {message}")]
    StorageWriteFailed { status: u16, message: String },

    #[error("Blob {id} not found ({status})")]
    NotFound { id: String, status: u16 },

    #[error("Network error: {0}")]
    TransportFailure(String),

    #[error("Invalid response from store: {0}")]
    InvalidResponse(String),
}

impl StorageError {
    /// Network failures and server-side (5xx) errors may succeed on retry
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransportFailure(_) => true,
            Self::StorageWriteFailed { status, .. } | Self::NotFound { status, .. } => {
                *status >= 500
            }
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Port for the remote content-addressed blob store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes for `epochs` retention periods.
    /// Identical bytes resolve to the identifier already stored.
    async fn upload(&self, blob: &[u8], epochs: u32) -> Result<BlobReceipt, StorageError>;

    /// Read a blob by identifier. The returned MIME type is the
    /// application's configured type, not the one the server declared.
    async fn fetch(&self, blob_id: &str) -> Result<AudioData, StorageError>;
}

/// Blanket implementation for boxed stores
#[async_trait]
impl BlobStore for Box<dyn BlobStore> {
    async fn upload(&self, blob: &[u8], epochs: u32) -> Result<BlobReceipt, StorageError> {
        self.as_ref().upload(blob, epochs).await
    }

    async fn fetch(&self, blob_id: &str) -> Result<AudioData, StorageError> {
        self.as_ref().fetch(blob_id).await
    }
}
