//! Capture device port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::AudioData;

/// Capture errors
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("No audio input device available: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Failed to encode audio: {0}")]
    EncodeFailed(String),
}

/// Port for a live microphone stream.
///
/// While open, the device buffers raw fragments that the caller drains
/// periodically. `assemble` turns the full fragment sequence into one
/// finished payload.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the input device and start buffering fragments.
    /// Fails with `DeviceUnavailable` if access is denied or no device exists.
    async fn open(&self) -> Result<(), CaptureError>;

    /// Take the fragments buffered since the previous drain
    fn drain_chunks(&self) -> Vec<Vec<u8>>;

    /// Release the device, returning fragments not yet drained.
    /// Closing a device that is not open returns no fragments.
    async fn close(&self) -> Result<Vec<Vec<u8>>, CaptureError>;

    /// Assemble fragments into the final payload
    async fn assemble(&self, chunks: &[Vec<u8>]) -> Result<AudioData, CaptureError>;

    /// Check if the device is currently held
    fn is_open(&self) -> bool;
}

/// Blanket implementation for boxed capture devices
#[async_trait]
impl CaptureDevice for Box<dyn CaptureDevice> {
    async fn open(&self) -> Result<(), CaptureError> {
        self.as_ref().open().await
    }

    fn drain_chunks(&self) -> Vec<Vec<u8>> {
        self.as_ref().drain_chunks()
    }

    async fn close(&self) -> Result<Vec<Vec<u8>>, CaptureError> {
        self.as_ref().close().await
    }

    async fn assemble(&self, chunks: &[Vec<u8>]) -> Result<AudioData, CaptureError> {
        self.as_ref().assemble(chunks).await
    }

    fn is_open(&self) -> bool {
        self.as_ref().is_open()
    }
}
