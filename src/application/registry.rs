//! Recording registry use case
//!
//! Ordered, newest-first list of stored recordings keyed by blob id.
//! Every mutation rewrites the backing store before it becomes visible.

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::recording::{DescriptorPatch, RecordingDescriptor};

use super::ports::{RegistryError, RegistryStore};

pub struct RecordingRegistry<S: RegistryStore> {
    store: S,
    entries: Mutex<Vec<RecordingDescriptor>>,
}

impl<S: RegistryStore> RecordingRegistry<S> {
    /// Read the persisted list. Duplicate ids keep their newest entry.
    pub async fn open(store: S) -> Result<Self, RegistryError> {
        let mut entries = store.read().await?;
        let before = entries.len();
        let mut seen = std::collections::HashSet::new();
        entries.retain(|d| seen.insert(d.id.clone()));
        if entries.len() != before {
            warn!(dropped = before - entries.len(), "dropped duplicate registry entries");
        }
        debug!(count = entries.len(), "registry loaded");

        Ok(Self {
            store,
            entries: Mutex::new(entries),
        })
    }

    pub async fn list(&self) -> Vec<RecordingDescriptor> {
        self.entries.lock().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<RecordingDescriptor> {
        self.entries.lock().await.iter().find(|d| d.id == id).cloned()
    }

    /// Insert at the front. An entry with the same id is replaced,
    /// which happens when identical bytes are uploaded again.
    pub async fn append(&self, descriptor: RecordingDescriptor) -> Result<(), RegistryError> {
        let mut entries = self.entries.lock().await;
        let mut next: Vec<RecordingDescriptor> = entries
            .iter()
            .filter(|d| d.id != descriptor.id)
            .cloned()
            .collect();
        next.insert(0, descriptor);

        self.store.write(&next).await?;
        *entries = next;
        Ok(())
    }

    /// Merge refined fields into an entry.
    /// Returns whether anything changed; unchanged entries are not rewritten.
    pub async fn update(&self, id: &str, patch: &DescriptorPatch) -> Result<bool, RegistryError> {
        let mut entries = self.entries.lock().await;
        let index = entries
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let mut next = entries.clone();
        if !next[index].apply(patch) {
            return Ok(false);
        }

        self.store.write(&next).await?;
        *entries = next;
        debug!(id, "registry entry updated");
        Ok(true)
    }

    /// Remove an entry; returns false if the id was not present
    pub async fn remove(&self, id: &str) -> Result<bool, RegistryError> {
        let mut entries = self.entries.lock().await;
        if !entries.iter().any(|d| d.id == id) {
            return Ok(false);
        }

        let next: Vec<RecordingDescriptor> =
            entries.iter().filter(|d| d.id != id).cloned().collect();
        self.store.write(&next).await?;
        *entries = next;
        Ok(true)
    }
}
