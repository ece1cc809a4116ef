//! Domain layer - Core business logic
//!
//! Contains value objects, the session state machine, the blob framing
//! format, and domain errors.
//! This layer has no dependencies on external systems.

pub mod config;
pub mod error;
pub mod framing;
pub mod receipt;
pub mod recording;
pub mod session;
pub mod share;

// Re-export common types
pub use config::AppConfig;
pub use error::*;
pub use framing::{FramedBlob, Metadata};
pub use receipt::{BlobReceipt, StoreOutcome};
pub use recording::{AudioData, AudioMimeType, DescriptorPatch, Duration, RecordingDescriptor};
pub use session::{CaptureSession, InvalidStateTransition, SessionState};
