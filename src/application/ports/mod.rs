//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod clipboard;
pub mod config;
pub mod playback;
pub mod registry;
pub mod storage;

// Re-export common types
pub use capture::{CaptureDevice, CaptureError};
pub use clipboard::{Clipboard, ClipboardError};
pub use config::ConfigStore;
pub use playback::{AudioOutput, PlaybackError};
pub use registry::{RegistryError, RegistryStore};
pub use storage::{BlobStore, StorageError};
