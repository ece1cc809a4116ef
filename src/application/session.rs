//! Recording session use case
//!
//! Drives one `CaptureSession` through capture, framing, upload, lazy fetch
//! and playback. Locks are held only between suspension points; results that
//! arrive after the session moved on are discarded.

use chrono::Local;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::framing::{self, FramedBlob, FramingError, Metadata};
use crate::domain::receipt::BlobReceipt;
use crate::domain::recording::{AudioData, DescriptorPatch, Duration, RecordingDescriptor};
use crate::domain::session::{CaptureSession, InvalidStateTransition, SessionState};
use crate::domain::share;
use crate::domain::config::{DEFAULT_EPOCHS, DEFAULT_SHARE_ORIGIN};

use super::playback::{PlaybackController, PlaybackState};
use super::ports::{
    AudioOutput, BlobStore, CaptureDevice, CaptureError, PlaybackError, RegistryError,
    RegistryStore, StorageError,
};
use super::registry::RecordingRegistry;

/// Longest title stored in metadata and the registry, in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Errors from the session use case
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Microphone unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Playback was blocked. Try again.")]
    AutoplayBlocked,

    #[error("Failed to fetch recording: {0}")]
    FetchFailed(#[source] StorageError),

    #[error("Failed to upload recording: {0}")]
    UploadFailed(#[source] StorageError),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),

    #[error("Nothing to play")]
    NothingToPlay,

    #[error("The session changed before the operation completed")]
    Superseded,

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Playback failed: {0}")]
    Playback(PlaybackError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to frame recording: {0}")]
    Framing(#[from] FramingError),
}

impl From<PlaybackError> for SessionError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::AutoplayBlocked(_) => Self::AutoplayBlocked,
            PlaybackError::NothingLoaded => Self::NothingToPlay,
            other => Self::Playback(other),
        }
    }
}

/// Configuration for a recording session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capture stops on its own at this length
    pub max_duration: Duration,
    /// Retention periods requested on upload
    pub epochs: u32,
    /// Origin that share links are built on
    pub share_origin: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::default_max_duration(),
            epochs: DEFAULT_EPOCHS,
            share_origin: DEFAULT_SHARE_ORIGIN.to_string(),
        }
    }
}

/// Result of a successful save
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub receipt: BlobReceipt,
    pub descriptor: RecordingDescriptor,
    pub share_link: String,
    /// Set when the blob was stored but the local list could not be updated
    pub registry_error: Option<RegistryError>,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub elapsed_seconds: u64,
    pub blob_id: String,
    pub error_message: Option<String>,
    pub duration_seconds: u64,
    pub has_payload: bool,
    pub title: Option<String>,
}

/// Recording session use case
pub struct RecordingSession<C, S, O, R>
where
    C: CaptureDevice,
    S: BlobStore,
    O: AudioOutput,
    R: RegistryStore,
{
    capture: C,
    store: S,
    playback: PlaybackController<O>,
    registry: RecordingRegistry<R>,
    session: Mutex<CaptureSession>,
    fetch_gate: Mutex<()>,
    stop_gate: Mutex<()>,
    config: SessionConfig,
}

impl<C, S, O, R> RecordingSession<C, S, O, R>
where
    C: CaptureDevice,
    S: BlobStore,
    O: AudioOutput,
    R: RegistryStore,
{
    /// Create a new session use case instance
    pub fn new(
        capture: C,
        store: S,
        playback: PlaybackController<O>,
        registry: RecordingRegistry<R>,
        config: SessionConfig,
    ) -> Self {
        Self {
            capture,
            store,
            playback,
            registry,
            session: Mutex::new(CaptureSession::new()),
            fetch_gate: Mutex::new(()),
            stop_gate: Mutex::new(()),
            config,
        }
    }

    pub fn registry(&self) -> &RecordingRegistry<R> {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get current session state
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().await;
        SessionSnapshot {
            state: session.state(),
            elapsed_seconds: session.elapsed_seconds(),
            blob_id: session.blob_id().to_string(),
            error_message: session.error_message().map(str::to_string),
            duration_seconds: session.display_duration(),
            has_payload: session.final_payload().is_some(),
            title: session
                .metadata()
                .map(|m| m.title.clone())
                .filter(|t| !t.is_empty()),
        }
    }

    /// Resolved payload, if any
    pub async fn payload(&self) -> Option<AudioData> {
        self.session.lock().await.final_payload().cloned()
    }

    /// Metadata carried by a fetched blob
    pub async fn metadata(&self) -> Option<Metadata> {
        self.session.lock().await.metadata().cloned()
    }

    /// Best known length in whole seconds
    pub async fn display_duration(&self) -> u64 {
        self.session.lock().await.display_duration()
    }

    /// Share link for the current blob, once one is known
    pub async fn share_link(&self) -> Option<String> {
        let session = self.session.lock().await;
        let blob_id = session.blob_id();
        (!blob_id.is_empty()).then(|| share::share_link(&self.config.share_origin, blob_id))
    }

    pub async fn playback_state(&self) -> PlaybackState {
        self.playback.state().await
    }

    /// Acquire the microphone and start capturing.
    /// Any previous recording and any active playback are discarded.
    pub async fn start_capture(&self) -> Result<(), SessionError> {
        let generation = {
            let mut session = self.session.lock().await;
            session.begin_capture()?
        };
        self.playback.invalidate().await;

        if let Err(e) = self.capture.open().await {
            warn!(error = %e, "failed to open capture device");
            let mut session = self.session.lock().await;
            if session.generation() == generation {
                session.reset();
            }
            return Err(match e {
                CaptureError::DeviceUnavailable(reason) => SessionError::DeviceUnavailable(reason),
                other => SessionError::Capture(other),
            });
        }

        let current = self.session.lock().await.generation();
        if current != generation {
            debug!("capture superseded while opening device");
            self.close_device().await;
            return Err(SessionError::Superseded);
        }

        info!(max_seconds = self.config.max_duration.as_secs(), "capture started");
        Ok(())
    }

    /// One-second timer step: collects device fragments and advances the clock.
    /// Returns true when the cap was reached and capture stopped.
    pub async fn tick(&self) -> Result<bool, SessionError> {
        let chunks = self.capture.drain_chunks();
        let reached_cap = {
            let mut session = self.session.lock().await;
            session.append_chunks(chunks);
            session.tick(self.config.max_duration.as_secs())?
        };

        if reached_cap {
            info!("maximum duration reached, stopping capture");
            self.stop_capture().await?;
        }
        Ok(reached_cap)
    }

    /// Stop capturing and assemble the payload.
    /// Calling it again once captured is a no-op.
    pub async fn stop_capture(&self) -> Result<(), SessionError> {
        let _stopping = self.stop_gate.lock().await;

        let (generation, mut chunks) = {
            let mut session = self.session.lock().await;
            match session.state() {
                SessionState::Capturing => {}
                SessionState::Captured if session.final_payload().is_some() => return Ok(()),
                current_state => {
                    return Err(InvalidStateTransition {
                        current_state,
                        action: "stop capture".to_string(),
                    }
                    .into())
                }
            }
            (session.generation(), session.take_chunks())
        };

        let tail = match self.capture.close().await {
            Ok(tail) => tail,
            Err(e) => {
                self.fail_if_current(generation, &e.to_string()).await;
                return Err(e.into());
            }
        };
        chunks.extend(tail);

        let audio = match self.capture.assemble(&chunks).await {
            Ok(audio) => audio,
            Err(e) => {
                self.fail_if_current(generation, &e.to_string()).await;
                return Err(e.into());
            }
        };

        let size = audio.human_readable_size();
        let mut session = self.session.lock().await;
        if !session.finish_capture(generation, audio) {
            debug!("discarding superseded capture");
            return Err(SessionError::Superseded);
        }
        info!(size = %size, seconds = session.elapsed_seconds(), "capture finished");
        Ok(())
    }

    /// Open a stored recording. Without `fetch_now` only the id is recorded
    /// and the bytes are fetched on first play.
    pub async fn load(&self, blob_id: &str, fetch_now: bool) -> Result<(), SessionError> {
        let (was_capturing, same_target) = {
            let mut session = self.session.lock().await;
            let same_target = session.blob_id() == blob_id
                && matches!(session.state(), SessionState::Captured | SessionState::Loading);
            let was_capturing = session.is_capturing();
            if was_capturing {
                session.reset();
            }
            (was_capturing, same_target)
        };

        if fetch_now && same_target {
            self.ensure_payload(blob_id).await?;
            return Ok(());
        }

        if was_capturing {
            debug!("discarding capture in favour of loaded recording");
            self.close_device().await;
        }
        self.playback.invalidate().await;

        {
            let mut session = self.session.lock().await;
            session.begin_load(blob_id, fetch_now)?;
        }
        debug!(blob_id, fetch_now, "recording loaded");

        if fetch_now {
            self.ensure_payload(blob_id).await?;
        }
        Ok(())
    }

    /// Play the current recording, fetching it first if it is lazy.
    pub async fn play(&self) -> Result<(), SessionError> {
        let (payload, blob_id, lazy) = {
            let session = self.session.lock().await;
            if session.is_capturing() {
                return Err(InvalidStateTransition {
                    current_state: session.state(),
                    action: "play".to_string(),
                }
                .into());
            }
            (
                session.final_payload().cloned(),
                session.blob_id().to_string(),
                session.is_lazy(),
            )
        };

        let payload = match payload {
            Some(payload) => payload,
            None if lazy => self.ensure_payload(&blob_id).await?,
            None => return Err(SessionError::NothingToPlay),
        };

        self.playback.unlock_once().await;
        let decoded = self.playback.load(&payload).await?;

        let refine = {
            let mut session = self.session.lock().await;
            let current = session.blob_id() == blob_id && session.final_payload() == Some(&payload);
            if current {
                session.set_decoded_duration(decoded);
            }
            current && !blob_id.is_empty()
        };
        if refine {
            self.refine_registry(&blob_id).await;
        }

        self.playback.play().await?;
        Ok(())
    }

    /// Pause playback; returns whether anything was playing
    pub async fn pause(&self) -> bool {
        self.playback.pause().await
    }

    /// Frame and upload the captured payload, then record it in the registry.
    /// On failure the payload is kept so `save` can be retried.
    pub async fn save(&self, title: Option<&str>) -> Result<SaveOutcome, SessionError> {
        let (generation, payload, duration) = {
            let mut session = self.session.lock().await;
            let duration = session.display_duration();
            let (generation, payload) = session.begin_upload()?;
            (generation, payload, duration)
        };

        let title = normalize_title(title);
        let metadata = Metadata::now(title.clone(), duration);
        let framed = FramedBlob::new(metadata.clone(), payload.data().to_vec());
        let blob = match framed.to_bytes() {
            Ok(blob) => blob,
            Err(e) => {
                self.session.lock().await.fail_upload(generation, e.to_string());
                return Err(e.into());
            }
        };

        info!(bytes = blob.len(), epochs = self.config.epochs, "uploading recording");
        let receipt = match self.store.upload(&blob, self.config.epochs).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, "upload failed");
                self.session.lock().await.fail_upload(generation, e.to_string());
                return Err(SessionError::UploadFailed(e));
            }
        };

        {
            let mut session = self.session.lock().await;
            if !session.complete_upload(generation, &receipt.blob_id) {
                debug!(blob_id = %receipt.blob_id, "discarding superseded upload");
                return Err(SessionError::Superseded);
            }
        }

        let descriptor = RecordingDescriptor {
            id: receipt.blob_id.clone(),
            title,
            duration_seconds: duration,
            created_at: metadata.timestamp,
            created_at_local: metadata.timestamp_with_tz,
            media_type: payload.mime_type().as_str().to_string(),
        };
        // The blob is stored remotely at this point, so the receipt must reach the caller
        let registry_error = match self.registry.append(descriptor.clone()).await {
            Ok(()) => None,
            Err(e) => {
                warn!(blob_id = %receipt.blob_id, error = %e, "stored recording was not added to the list");
                Some(e)
            }
        };
        info!(blob_id = %receipt.blob_id, "recording shared");

        Ok(SaveOutcome {
            share_link: share::share_link(&self.config.share_origin, &receipt.blob_id),
            receipt,
            descriptor,
            registry_error,
        })
    }

    /// Return to idle, releasing the microphone and any playback.
    /// In-flight uploads and fetches are not aborted; their results are dropped.
    pub async fn reset(&self) {
        let was_capturing = {
            let mut session = self.session.lock().await;
            let capturing = session.is_capturing();
            session.reset();
            capturing
        };
        if was_capturing {
            self.close_device().await;
        }
        self.playback.invalidate().await;
        debug!("session reset");
    }

    /// Remove a recording from the registry. Deleting the open recording
    /// also resets the session.
    pub async fn delete(&self, blob_id: &str) -> Result<bool, SessionError> {
        let removed = self.registry.remove(blob_id).await?;
        let is_current = self.session.lock().await.blob_id() == blob_id;
        if is_current {
            self.reset().await;
        }
        Ok(removed)
    }

    /// Resolve the payload for `blob_id`, fetching at most once at a time
    async fn ensure_payload(&self, blob_id: &str) -> Result<AudioData, SessionError> {
        let _gate = self.fetch_gate.lock().await;

        {
            let mut session = self.session.lock().await;
            if session.blob_id() != blob_id {
                return Err(SessionError::Superseded);
            }
            if let Some(payload) = session.final_payload() {
                return Ok(payload.clone());
            }
            if !session.begin_fetch(blob_id) {
                return Err(SessionError::Superseded);
            }
        }

        debug!(blob_id, "fetching recording");
        let fetched = match self.store.fetch(blob_id).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(blob_id, error = %e, "fetch failed");
                self.session.lock().await.fail_fetch(blob_id, e.to_string());
                return Err(SessionError::FetchFailed(e));
            }
        };

        let mime_type = fetched.mime_type();
        let framed = framing::decode(&fetched.into_data());
        let payload = AudioData::new(framed.payload, mime_type);

        {
            let mut session = self.session.lock().await;
            if !session.complete_fetch(blob_id, payload.clone(), framed.metadata) {
                debug!(blob_id, "discarding superseded fetch");
                return Err(SessionError::Superseded);
            }
        }

        self.refine_registry(blob_id).await;
        Ok(payload)
    }

    /// Copy the best known duration, and an embedded title when the entry
    /// has none, into the registry. Failures are only logged.
    async fn refine_registry(&self, blob_id: &str) {
        let Some(entry) = self.registry.get(blob_id).await else {
            return;
        };

        let patch = {
            let session = self.session.lock().await;
            if session.blob_id() != blob_id {
                return;
            }
            let duration = session.display_duration();
            DescriptorPatch {
                duration_seconds: (duration > 0).then_some(duration),
                title: session
                    .metadata()
                    .map(|m| m.title.clone())
                    .filter(|t| !t.is_empty() && entry.title.is_empty()),
            }
        };
        if patch.is_empty() {
            return;
        }

        if let Err(e) = self.registry.update(blob_id, &patch).await {
            warn!(blob_id, error = %e, "failed to refine registry entry");
        }
    }

    async fn fail_if_current(&self, generation: u64, message: &str) {
        let mut session = self.session.lock().await;
        if session.generation() == generation {
            session.fail(message);
        }
    }

    async fn close_device(&self) {
        if let Err(e) = self.capture.close().await {
            warn!(error = %e, "failed to release capture device");
        }
    }
}

/// Trimmed, length-limited title; generated when blank
fn normalize_title(title: Option<&str>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => title.chars().take(MAX_TITLE_CHARS).collect(),
        None => default_title(),
    }
}

fn default_title() -> String {
    format!("Recording {}", Local::now().format("%Y-%m-%d %H:%M:%S"))
}
