//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with the microphone, the speakers, the Walrus HTTP API
//! and local files.

pub mod capture;
pub mod clipboard;
pub mod config;
pub mod playback;
pub mod registry;
pub mod storage;

// Re-export adapters
pub use capture::CpalCapture;
pub use clipboard::ArboardClipboard;
pub use config::XdgConfigStore;
pub use playback::RodioOutput;
pub use registry::{default_registry_path, JsonFileRegistry};
pub use storage::{RetryingStore, WalrusStore};
