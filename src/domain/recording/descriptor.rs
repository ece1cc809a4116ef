//! Persisted summary of one stored recording

use serde::{Deserialize, Serialize};

/// One entry of the recording registry.
///
/// `id` is the store's blob identifier and never changes once assigned.
/// `title` and `duration_seconds` may be refined after the audio is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDescriptor {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub duration_seconds: u64,
    pub created_at: String,
    #[serde(default)]
    pub created_at_local: String,
    #[serde(default)]
    pub media_type: String,
}

/// Fields that may be merged into an existing descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorPatch {
    pub title: Option<String>,
    pub duration_seconds: Option<u64>,
}

impl DescriptorPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn duration(seconds: u64) -> Self {
        Self {
            duration_seconds: Some(seconds),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.duration_seconds.is_none()
    }
}

impl RecordingDescriptor {
    /// Merge a patch; returns whether anything changed
    pub fn apply(&mut self, patch: &DescriptorPatch) -> bool {
        let mut changed = false;
        if let Some(title) = &patch.title {
            if *title != self.title {
                self.title = title.clone();
                changed = true;
            }
        }
        if let Some(seconds) = patch.duration_seconds {
            if seconds != self.duration_seconds {
                self.duration_seconds = seconds;
                changed = true;
            }
        }
        changed
    }
}
