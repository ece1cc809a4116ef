//! Walrus publisher/aggregator adapter

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use crate::application::ports::{BlobStore, StorageError};
use crate::domain::receipt::BlobReceipt;
use crate::domain::recording::{AudioData, AudioMimeType};

/// HTTP blob store: writes go to a publisher, reads to an aggregator
pub struct WalrusStore {
    publisher_url: String,
    aggregator_url: String,
    media_type: AudioMimeType,
    client: reqwest::Client,
}

impl WalrusStore {
    /// Create a store with the default FLAC media type
    pub fn new(publisher_url: impl Into<String>, aggregator_url: impl Into<String>) -> Self {
        Self {
            publisher_url: publisher_url.into(),
            aggregator_url: aggregator_url.into(),
            media_type: AudioMimeType::default(),
            client: reqwest::Client::new(),
        }
    }

    /// Media type reported for fetched blobs
    pub fn with_media_type(mut self, media_type: AudioMimeType) -> Self {
        self.media_type = media_type;
        self
    }

    fn upload_url(&self, epochs: u32) -> String {
        format!(
            "{}/v1/blobs?epochs={}",
            self.publisher_url.trim_end_matches('/'),
            epochs
        )
    }

    fn fetch_url(&self, blob_id: &str) -> String {
        format!(
            "{}/v1/blobs/{}",
            self.aggregator_url.trim_end_matches('/'),
            blob_id
        )
    }
}

#[async_trait]
impl BlobStore for WalrusStore {
    async fn upload(&self, blob: &[u8], epochs: u32) -> Result<BlobReceipt, StorageError> {
        let url = self.upload_url(epochs);
        debug!(%url, bytes = blob.len(), "storing blob");

        let response = self
            .client
            .put(&url)
            .body(blob.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::TransportFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StorageError::StorageWriteFailed {
                status: status.as_u16(),
                message,
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        BlobReceipt::from_response(raw)
            .ok_or_else(|| StorageError::InvalidResponse("response carries no blob id".into()))
    }

    async fn fetch(&self, blob_id: &str) -> Result<AudioData, StorageError> {
        let url = self.fetch_url(blob_id);
        debug!(%url, "reading blob");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StorageError::TransportFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::NotFound {
                id: blob_id.to_string(),
                status: status.as_u16(),
            });
        }

        // Aggregators often answer application/octet-stream; the declared type is ignored
        if let Some(declared) = response.headers().get(CONTENT_TYPE) {
            debug!(declared = ?declared, using = %self.media_type, "overriding content type");
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::TransportFailure(e.to_string()))?;

        Ok(AudioData::new(bytes.to_vec(), self.media_type))
    }
}
