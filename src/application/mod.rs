//! Application layer - Use cases and port interfaces
//!
//! Contains the core business operations and trait definitions
//! for external system interactions.

pub mod playback;
pub mod ports;
pub mod registry;
pub mod session;

// Re-export use cases
pub use playback::{PlaybackController, PlaybackState, AUTOPLAY_RETRIES};
pub use registry::RecordingRegistry;
pub use session::{
    RecordingSession, SaveOutcome, SessionConfig, SessionError, SessionSnapshot, MAX_TITLE_CHARS,
};
