//! Recording list stored as one JSON array on disk

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::application::ports::{RegistryError, RegistryStore};
use crate::domain::recording::RecordingDescriptor;

/// Default location under the user's data directory
pub fn default_registry_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("whistle")
        .join("recordings.json")
}

pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Default for JsonFileRegistry {
    fn default() -> Self {
        Self::new(default_registry_path())
    }
}

#[async_trait]
impl RegistryStore for JsonFileRegistry {
    async fn read(&self) -> Result<Vec<RecordingDescriptor>, RegistryError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistryError::ReadFailed(e.to_string())),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| RegistryError::Corrupt(e.to_string()))
    }

    async fn write(&self, descriptors: &[RecordingDescriptor]) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RegistryError::WriteFailed(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(descriptors)
            .map_err(|e| RegistryError::WriteFailed(e.to_string()))?;

        // Write beside the target and rename so a crash never leaves half a list
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, content)
            .await
            .map_err(|e| RegistryError::WriteFailed(e.to_string()))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|e| RegistryError::WriteFailed(e.to_string()))?;

        debug!(path = %self.path.display(), count = descriptors.len(), "registry written");
        Ok(())
    }
}
