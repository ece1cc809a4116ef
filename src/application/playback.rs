//! Playback controller
//!
//! Wraps an `AudioOutput` with a stopped/playing state, a one-time unlock,
//! and bounded retry when the platform rejects playback.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::recording::AudioData;

use super::ports::{AudioOutput, PlaybackError};

/// Extra start attempts after an autoplay rejection
pub const AUTOPLAY_RETRIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

#[derive(Debug, Default)]
struct Loaded {
    state: PlaybackState,
    audio: Option<AudioData>,
    decoded_duration: Option<f64>,
}

pub struct PlaybackController<O: AudioOutput> {
    output: O,
    loaded: Mutex<Loaded>,
    unlocked: AtomicBool,
}

impl<O: AudioOutput> PlaybackController<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            loaded: Mutex::new(Loaded::default()),
            unlocked: AtomicBool::new(false),
        }
    }

    /// Current state; a payload that played to the end counts as stopped
    pub async fn state(&self) -> PlaybackState {
        let mut loaded = self.loaded.lock().await;
        self.refresh(&mut loaded);
        loaded.state
    }

    /// Run the unlock routine once per controller. Failures are only logged.
    pub async fn unlock_once(&self) {
        if self.unlocked.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.output.unlock().await {
            Ok(()) => debug!("audio output unlocked"),
            Err(e) => warn!(error = %e, "audio unlock failed"),
        }
    }

    /// Cache a payload for playback, returning its decoded length.
    /// Loading the payload that is already cached does not decode again.
    pub async fn load(&self, audio: &AudioData) -> Result<Option<f64>, PlaybackError> {
        let mut loaded = self.loaded.lock().await;
        if loaded.audio.as_ref() == Some(audio) {
            return Ok(loaded.decoded_duration);
        }

        if loaded.state == PlaybackState::Playing {
            self.output.pause();
        }
        *loaded = Loaded::default();

        let duration = self.output.prepare(audio).await?;
        loaded.audio = Some(audio.clone());
        loaded.decoded_duration = duration;
        Ok(duration)
    }

    /// Start the cached payload from zero at full volume.
    ///
    /// An autoplay rejection is retried with a fresh prepare; if it persists
    /// the controller stays stopped with the payload still cached.
    pub async fn play(&self) -> Result<(), PlaybackError> {
        let mut loaded = self.loaded.lock().await;
        self.refresh(&mut loaded);

        if loaded.state == PlaybackState::Playing {
            return Err(PlaybackError::AlreadyPlaying);
        }
        let audio = loaded.audio.clone().ok_or(PlaybackError::NothingLoaded)?;

        let mut attempt = 0;
        loop {
            match self.output.start(1.0).await {
                Ok(()) => {
                    loaded.state = PlaybackState::Playing;
                    return Ok(());
                }
                Err(PlaybackError::AutoplayBlocked(reason)) if attempt < AUTOPLAY_RETRIES => {
                    attempt += 1;
                    debug!(attempt, %reason, "playback blocked, preparing again");
                    self.output.prepare(&audio).await?;
                }
                Err(e) => {
                    loaded.state = PlaybackState::Stopped;
                    return Err(e);
                }
            }
        }
    }

    /// Pause if playing; returns whether anything was paused
    pub async fn pause(&self) -> bool {
        let mut loaded = self.loaded.lock().await;
        self.refresh(&mut loaded);
        if loaded.state != PlaybackState::Playing {
            return false;
        }
        self.output.pause();
        loaded.state = PlaybackState::Stopped;
        true
    }

    /// Stop output and drop the cached payload
    pub async fn invalidate(&self) {
        let mut loaded = self.loaded.lock().await;
        if loaded.state == PlaybackState::Playing {
            self.output.pause();
        }
        if loaded.audio.is_some() {
            self.output.release();
        }
        *loaded = Loaded::default();
    }

    fn refresh(&self, loaded: &mut Loaded) {
        if loaded.state == PlaybackState::Playing && self.output.is_finished() {
            loaded.state = PlaybackState::Stopped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recording::AudioMimeType;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[derive(Default, Clone)]
    struct MockOutput {
        blocked_starts: Arc<AtomicU32>,
        starts: Arc<AtomicU32>,
        prepares: Arc<AtomicU32>,
        unlocks: Arc<AtomicU32>,
        finished: Arc<AtomicBool>,
        fail_unlock: bool,
    }

    impl MockOutput {
        fn blocking(times: u32) -> Self {
            let output = Self::default();
            output.blocked_starts.store(times, Ordering::SeqCst);
            output
        }
    }

    #[async_trait]
    impl AudioOutput for MockOutput {
        async fn unlock(&self) -> Result<(), PlaybackError> {
            self.unlocks.fetch_add(1, Ordering::SeqCst);
            if self.fail_unlock {
                return Err(PlaybackError::DeviceUnavailable("no sink".into()));
            }
            Ok(())
        }

        async fn prepare(&self, _audio: &AudioData) -> Result<Option<f64>, PlaybackError> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            Ok(Some(17.0))
        }

        async fn start(&self, volume: f32) -> Result<(), PlaybackError> {
            assert_eq!(volume, 1.0);
            self.starts.fetch_add(1, Ordering::SeqCst);
            let remaining = self.blocked_starts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.blocked_starts.store(remaining - 1, Ordering::SeqCst);
                return Err(PlaybackError::AutoplayBlocked("gesture required".into()));
            }
            Ok(())
        }

        fn pause(&self) {}

        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }

        fn release(&self) {}
    }

    fn audio() -> AudioData {
        AudioData::from_bytes(b"fLaC....", AudioMimeType::Flac)
    }

    #[tokio::test]
    async fn play_requires_payload() {
        let controller = PlaybackController::new(MockOutput::default());
        assert!(matches!(
            controller.play().await,
            Err(PlaybackError::NothingLoaded)
        ));
    }

    #[tokio::test]
    async fn load_then_play() {
        let output = MockOutput::default();
        let controller = PlaybackController::new(output.clone());

        assert_eq!(controller.load(&audio()).await.unwrap(), Some(17.0));
        controller.play().await.unwrap();
        assert_eq!(controller.state().await, PlaybackState::Playing);
        assert!(matches!(
            controller.play().await,
            Err(PlaybackError::AlreadyPlaying)
        ));
    }

    #[tokio::test]
    async fn loading_same_payload_does_not_decode_again() {
        let output = MockOutput::default();
        let controller = PlaybackController::new(output.clone());

        controller.load(&audio()).await.unwrap();
        controller.load(&audio()).await.unwrap();
        assert_eq!(output.prepares.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn autoplay_rejection_is_retried() {
        let output = MockOutput::blocking(1);
        let controller = PlaybackController::new(output.clone());

        controller.load(&audio()).await.unwrap();
        controller.play().await.unwrap();
        assert_eq!(output.starts.load(Ordering::SeqCst), 2);
        assert_eq!(controller.state().await, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn persistent_autoplay_rejection_keeps_payload() {
        let output = MockOutput::blocking(5);
        let controller = PlaybackController::new(output.clone());

        controller.load(&audio()).await.unwrap();
        let err = controller.play().await.unwrap_err();
        assert!(matches!(err, PlaybackError::AutoplayBlocked(_)));
        assert_eq!(controller.state().await, PlaybackState::Stopped);
        assert!(controller.loaded.lock().await.audio.is_some());

        // The user retries the gesture; no new load is needed
        output.blocked_starts.store(0, Ordering::SeqCst);
        controller.play().await.unwrap();
        assert_eq!(controller.state().await, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn pause_only_from_playing() {
        let controller = PlaybackController::new(MockOutput::default());
        assert!(!controller.pause().await);

        controller.load(&audio()).await.unwrap();
        controller.play().await.unwrap();
        assert!(controller.pause().await);
        assert_eq!(controller.state().await, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn finished_playback_reports_stopped() {
        let output = MockOutput::default();
        let controller = PlaybackController::new(output.clone());
        controller.load(&audio()).await.unwrap();
        controller.play().await.unwrap();

        output.finished.store(true, Ordering::SeqCst);
        assert_eq!(controller.state().await, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn unlock_runs_once_and_tolerates_failure() {
        let output = MockOutput {
            fail_unlock: true,
            ..Default::default()
        };
        let controller = PlaybackController::new(output.clone());

        controller.unlock_once().await;
        controller.unlock_once().await;
        assert_eq!(output.unlocks.load(Ordering::SeqCst), 1);

        controller.load(&audio()).await.unwrap();
        assert!(controller.play().await.is_ok());
    }

    #[tokio::test]
    async fn invalidate_drops_payload() {
        let controller = PlaybackController::new(MockOutput::default());
        controller.load(&audio()).await.unwrap();
        controller.play().await.unwrap();

        controller.invalidate().await;
        assert_eq!(controller.state().await, PlaybackState::Stopped);
        let loaded = controller.loaded.lock().await;
        assert!(loaded.audio.is_none());
        assert!(loaded.decoded_duration.is_none());
    }
}
