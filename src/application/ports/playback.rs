//! Audio output port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::AudioData;

/// Playback errors
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("Playback was blocked by the platform: {0}")]
    AutoplayBlocked(String),

    #[error("No audio output device available: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    #[error("Nothing is loaded for playback")]
    NothingLoaded,

    #[error("Already playing")]
    AlreadyPlaying,
}

/// Port for the audio output device
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Push a near-silent sample through the output pipeline
    async fn unlock(&self) -> Result<(), PlaybackError>;

    /// Decode and cache a payload, positioned at zero.
    /// Returns the decoded length in seconds when the decoder knows it.
    async fn prepare(&self, audio: &AudioData) -> Result<Option<f64>, PlaybackError>;

    /// Start the prepared payload from position zero at `volume` (0.0..=1.0)
    async fn start(&self, volume: f32) -> Result<(), PlaybackError>;

    /// Pause output; never fails
    fn pause(&self);

    /// Whether the started payload has played to the end
    fn is_finished(&self) -> bool;

    /// Drop the prepared payload and any output resources
    fn release(&self);
}

/// Blanket implementation for boxed outputs
#[async_trait]
impl AudioOutput for Box<dyn AudioOutput> {
    async fn unlock(&self) -> Result<(), PlaybackError> {
        self.as_ref().unlock().await
    }

    async fn prepare(&self, audio: &AudioData) -> Result<Option<f64>, PlaybackError> {
        self.as_ref().prepare(audio).await
    }

    async fn start(&self, volume: f32) -> Result<(), PlaybackError> {
        self.as_ref().start(volume).await
    }

    fn pause(&self) {
        self.as_ref().pause()
    }

    fn is_finished(&self) -> bool {
        self.as_ref().is_finished()
    }

    fn release(&self) {
        self.as_ref().release()
    }
}
