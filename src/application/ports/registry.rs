//! Registry storage port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::RecordingDescriptor;

/// Registry errors
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Failed to read recording list: {0}")]
    ReadFailed(String),

    #[error("Failed to write recording list: {0}")]
    WriteFailed(String),

    #[error("Recording list is corrupt: {0}")]
    Corrupt(String),

    #[error("No recording with id {0}")]
    NotFound(String),
}

/// Port for the persisted list of recording descriptors.
/// The whole list is read once and rewritten on every mutation.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Read all descriptors, newest first. A missing list is empty.
    async fn read(&self) -> Result<Vec<RecordingDescriptor>, RegistryError>;

    /// Replace the stored list
    async fn write(&self, descriptors: &[RecordingDescriptor]) -> Result<(), RegistryError>;
}
