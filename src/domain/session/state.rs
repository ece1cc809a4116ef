//! Capture session state machine
//!
//! Pure state and transitions; device, network and playback I/O happen in
//! the application layer, which calls into this type between suspension
//! points.

use std::fmt;
use thiserror::Error;

use crate::domain::framing::Metadata;
use crate::domain::recording::{resolve_duration, AudioData};

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Capturing,
    Captured,
    Loading,
    Uploading,
    Shared,
    Error,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Captured => "captured",
            Self::Loading => "loading",
            Self::Uploading => "uploading",
            Self::Shared => "shared",
            Self::Error => "error",
        }
    }

    /// States a new capture or load may begin from (after an implicit reset)
    const fn is_restartable(&self) -> bool {
        matches!(self, Self::Idle | Self::Captured | Self::Error | Self::Shared)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub action: String,
}

/// In-memory state of one recording (captured or loaded).
///
/// State machine:
///   IDLE|CAPTURED|ERROR|SHARED -> CAPTURING (begin_capture)
///   CAPTURING -> CAPTURED (finish_capture)
///   IDLE|CAPTURED|ERROR|SHARED -> CAPTURED (begin_load, lazy)
///   IDLE|CAPTURED|ERROR|SHARED -> LOADING (begin_load, eager)
///   CAPTURED|ERROR -> LOADING (begin_fetch, payload unresolved)
///   LOADING -> CAPTURED | ERROR (complete_fetch / fail_fetch)
///   CAPTURED|ERROR -> UPLOADING (begin_upload, payload present)
///   UPLOADING -> SHARED | ERROR (complete_upload / fail_upload)
///   any -> IDLE (reset)
#[derive(Debug, Default)]
pub struct CaptureSession {
    state: SessionState,
    elapsed_seconds: u64,
    chunks: Vec<Vec<u8>>,
    final_payload: Option<AudioData>,
    blob_id: String,
    error_message: Option<String>,
    metadata: Option<Metadata>,
    decoded_duration: Option<f64>,
    generation: u64,
}

impl CaptureSession {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn is_capturing(&self) -> bool {
        self.state == SessionState::Capturing
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn final_payload(&self) -> Option<&AudioData> {
        self.final_payload.as_ref()
    }

    /// Empty until the recording is persisted or loaded
    pub fn blob_id(&self) -> &str {
        &self.blob_id
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Metadata decoded from a fetched blob, if it carried any
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A blob id is known but its bytes have not been fetched yet
    pub fn is_lazy(&self) -> bool {
        !self.blob_id.is_empty() && self.final_payload.is_none()
    }

    /// Record the length reported by the decoder
    pub fn set_decoded_duration(&mut self, seconds: Option<f64>) {
        self.decoded_duration = seconds;
    }

    /// Best known length in whole seconds, never NaN or infinite
    pub fn display_duration(&self) -> u64 {
        let from_metadata = self.metadata.as_ref().map(|m| m.duration as f64);
        let timer = (self.elapsed_seconds > 0).then_some(self.elapsed_seconds);
        resolve_duration(from_metadata, self.decoded_duration, timer)
    }

    /// Transition to CAPTURING, discarding any previous recording.
    /// Returns the generation of the new capture.
    pub fn begin_capture(&mut self) -> Result<u64, InvalidStateTransition> {
        if !self.state.is_restartable() {
            return Err(self.invalid("start capture"));
        }
        self.clear();
        self.state = SessionState::Capturing;
        Ok(self.generation)
    }

    /// Append device chunks; ignored outside CAPTURING
    pub fn append_chunks(&mut self, chunks: Vec<Vec<u8>>) {
        if self.is_capturing() {
            self.chunks.extend(chunks.into_iter().filter(|c| !c.is_empty()));
        }
    }

    /// Advance the capture timer by one second.
    /// Returns true once the cap is reached.
    pub fn tick(&mut self, max_seconds: u64) -> Result<bool, InvalidStateTransition> {
        if !self.is_capturing() {
            return Err(self.invalid("advance the capture timer"));
        }
        if self.elapsed_seconds < max_seconds {
            self.elapsed_seconds += 1;
        }
        Ok(self.elapsed_seconds >= max_seconds)
    }

    /// Take the buffered chunks for assembly
    pub fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.chunks)
    }

    /// CAPTURING -> CAPTURED. Ignored if the capture was superseded.
    pub fn finish_capture(&mut self, generation: u64, payload: AudioData) -> bool {
        if generation != self.generation || !self.is_capturing() {
            return false;
        }
        self.final_payload = Some(payload);
        self.state = SessionState::Captured;
        true
    }

    /// Point the session at a stored blob.
    /// With `fetch_now == false` the session ends CAPTURED with no payload.
    pub fn begin_load(&mut self, blob_id: &str, fetch_now: bool) -> Result<u64, InvalidStateTransition> {
        if !self.state.is_restartable() {
            return Err(self.invalid("load a recording"));
        }
        self.clear();
        self.blob_id = blob_id.to_string();
        self.state = if fetch_now {
            SessionState::Loading
        } else {
            SessionState::Captured
        };
        Ok(self.generation)
    }

    /// Mark the unresolved payload of `blob_id` as being fetched.
    /// Returns false if this session is not waiting for that blob.
    pub fn begin_fetch(&mut self, blob_id: &str) -> bool {
        let waiting = matches!(
            self.state,
            SessionState::Captured | SessionState::Loading | SessionState::Error
        );
        if !waiting || self.blob_id != blob_id || self.final_payload.is_some() {
            return false;
        }
        self.state = SessionState::Loading;
        self.error_message = None;
        true
    }

    /// Apply a fetched blob if the session still targets it
    pub fn complete_fetch(&mut self, blob_id: &str, payload: AudioData, metadata: Option<Metadata>) -> bool {
        let waiting = matches!(self.state, SessionState::Loading | SessionState::Captured);
        if !waiting || self.blob_id != blob_id || self.final_payload.is_some() {
            return false;
        }
        self.final_payload = Some(payload);
        self.metadata = metadata;
        self.error_message = None;
        self.state = SessionState::Captured;
        true
    }

    /// LOADING -> ERROR, keeping the blob id so the fetch can be retried
    pub fn fail_fetch(&mut self, blob_id: &str, message: impl Into<String>) -> bool {
        if self.state != SessionState::Loading || self.blob_id != blob_id {
            return false;
        }
        self.error_message = Some(message.into());
        self.state = SessionState::Error;
        true
    }

    /// CAPTURED|ERROR -> UPLOADING. Requires a non-empty payload.
    /// Returns the generation and the payload to frame.
    pub fn begin_upload(&mut self) -> Result<(u64, AudioData), InvalidStateTransition> {
        let ready = matches!(self.state, SessionState::Captured | SessionState::Error);
        let payload = match (&self.final_payload, ready) {
            (Some(payload), true) if !payload.is_empty() => payload.clone(),
            _ => return Err(self.invalid("save a recording")),
        };
        self.error_message = None;
        self.state = SessionState::Uploading;
        Ok((self.generation, payload))
    }

    /// UPLOADING -> SHARED. Ignored if the upload was superseded.
    pub fn complete_upload(&mut self, generation: u64, blob_id: &str) -> bool {
        if generation != self.generation || self.state != SessionState::Uploading {
            return false;
        }
        self.blob_id = blob_id.to_string();
        self.state = SessionState::Shared;
        true
    }

    /// UPLOADING -> ERROR; the payload is kept for a retry
    pub fn fail_upload(&mut self, generation: u64, message: impl Into<String>) -> bool {
        if generation != self.generation || self.state != SessionState::Uploading {
            return false;
        }
        self.error_message = Some(message.into());
        self.state = SessionState::Error;
        true
    }

    /// Move to ERROR from any state
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
        self.state = SessionState::Error;
    }

    /// Clear everything and return to IDLE
    pub fn reset(&mut self) {
        self.clear();
        self.state = SessionState::Idle;
    }

    fn clear(&mut self) {
        self.elapsed_seconds = 0;
        self.chunks.clear();
        self.final_payload = None;
        self.blob_id.clear();
        self.error_message = None;
        self.metadata = None;
        self.decoded_duration = None;
        self.generation += 1;
    }

    fn invalid(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state,
            action: action.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recording::AudioMimeType;

    fn audio(bytes: &[u8]) -> AudioData {
        AudioData::from_bytes(bytes, AudioMimeType::Flac)
    }

    fn captured() -> CaptureSession {
        let mut session = CaptureSession::new();
        let generation = session.begin_capture().unwrap();
        session.append_chunks(vec![b"ab".to_vec()]);
        assert!(session.finish_capture(generation, audio(b"ab")));
        session
    }

    #[test]
    fn new_session_is_idle() {
        let session = CaptureSession::new();
        assert!(session.is_idle());
        assert!(session.blob_id().is_empty());
        assert!(session.final_payload().is_none());
    }

    #[test]
    fn capture_cycle() {
        let mut session = CaptureSession::new();
        let generation = session.begin_capture().unwrap();
        assert!(session.is_capturing());

        session.append_chunks(vec![b"a".to_vec(), Vec::new(), b"b".to_vec()]);
        assert_eq!(session.chunks.len(), 2);
        assert!(!session.tick(1800).unwrap());

        let chunks = session.take_chunks();
        assert!(session.finish_capture(generation, audio(&chunks.concat())));
        assert_eq!(session.state(), SessionState::Captured);
        assert_eq!(session.final_payload().unwrap().data(), b"ab");
        assert_eq!(session.elapsed_seconds(), 1);
    }

    #[test]
    fn start_capture_while_capturing_fails() {
        let mut session = CaptureSession::new();
        session.begin_capture().unwrap();

        let err = session.begin_capture().unwrap_err();
        assert_eq!(err.current_state, SessionState::Capturing);
        assert!(err.action.contains("start capture"));
    }

    #[test]
    fn start_capture_from_captured_discards_previous() {
        let mut session = captured();
        session.begin_capture().unwrap();
        assert!(session.final_payload().is_none());
        assert_eq!(session.elapsed_seconds(), 0);
    }

    #[test]
    fn tick_stops_at_cap() {
        let mut session = CaptureSession::new();
        session.begin_capture().unwrap();
        assert!(!session.tick(2).unwrap());
        assert!(session.tick(2).unwrap());
        assert!(session.tick(2).unwrap());
        assert_eq!(session.elapsed_seconds(), 2);
    }

    #[test]
    fn tick_outside_capture_fails() {
        let mut session = CaptureSession::new();
        assert_eq!(session.tick(10).unwrap_err().current_state, SessionState::Idle);
    }

    #[test]
    fn stale_capture_result_is_ignored() {
        let mut session = CaptureSession::new();
        let generation = session.begin_capture().unwrap();
        session.reset();
        assert!(!session.finish_capture(generation, audio(b"x")));
        assert!(session.is_idle());
    }

    #[test]
    fn lazy_load_leaves_payload_unresolved() {
        let mut session = CaptureSession::new();
        session.begin_load("abc123", false).unwrap();
        assert_eq!(session.state(), SessionState::Captured);
        assert_eq!(session.blob_id(), "abc123");
        assert!(session.is_lazy());
    }

    #[test]
    fn eager_load_then_fetch() {
        let mut session = CaptureSession::new();
        session.begin_load("abc123", true).unwrap();
        assert_eq!(session.state(), SessionState::Loading);

        assert!(session.complete_fetch("abc123", audio(b"pcm"), None));
        assert_eq!(session.state(), SessionState::Captured);
        assert!(!session.is_lazy());
    }

    #[test]
    fn fetch_for_other_blob_is_ignored() {
        let mut session = CaptureSession::new();
        session.begin_load("new", true).unwrap();
        assert!(!session.complete_fetch("old", audio(b"pcm"), None));
        assert!(!session.fail_fetch("old", "boom"));
        assert_eq!(session.state(), SessionState::Loading);
    }

    #[test]
    fn failed_fetch_keeps_blob_id_and_can_retry() {
        let mut session = CaptureSession::new();
        session.begin_load("abc", true).unwrap();
        assert!(session.fail_fetch("abc", "not found"));
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(session.blob_id(), "abc");
        assert_eq!(session.error_message(), Some("not found"));

        assert!(session.begin_fetch("abc"));
        assert_eq!(session.state(), SessionState::Loading);
        assert!(session.error_message().is_none());
    }

    #[test]
    fn load_while_uploading_fails() {
        let mut session = captured();
        session.begin_upload().unwrap();
        let err = session.begin_load("x", false).unwrap_err();
        assert_eq!(err.current_state, SessionState::Uploading);
    }

    #[test]
    fn upload_cycle() {
        let mut session = captured();
        let (generation, payload) = session.begin_upload().unwrap();
        assert_eq!(payload.data(), b"ab");
        assert_eq!(session.state(), SessionState::Uploading);

        assert!(session.complete_upload(generation, "abc123"));
        assert_eq!(session.state(), SessionState::Shared);
        assert_eq!(session.blob_id(), "abc123");
    }

    #[test]
    fn failed_upload_keeps_payload_for_retry() {
        let mut session = captured();
        let (generation, _) = session.begin_upload().unwrap();
        assert!(session.fail_upload(generation, "503"));
        assert_eq!(session.state(), SessionState::Error);
        assert!(session.final_payload().is_some());

        assert!(session.begin_upload().is_ok());
    }

    #[test]
    fn upload_requires_payload() {
        let mut session = CaptureSession::new();
        assert!(session.begin_upload().is_err());

        session.begin_load("abc", false).unwrap();
        let err = session.begin_upload().unwrap_err();
        assert_eq!(err.current_state, SessionState::Captured);

        let mut empty = CaptureSession::new();
        let generation = empty.begin_capture().unwrap();
        empty.finish_capture(generation, audio(b""));
        assert!(empty.begin_upload().is_err());
    }

    #[test]
    fn reset_discards_in_flight_upload() {
        let mut session = captured();
        let (generation, _) = session.begin_upload().unwrap();
        session.reset();
        assert!(!session.complete_upload(generation, "abc"));
        assert!(!session.fail_upload(generation, "late"));
        assert!(session.is_idle());
    }

    #[test]
    fn display_duration_prefers_metadata() {
        let mut session = CaptureSession::new();
        session.begin_load("abc", true).unwrap();
        let metadata = Metadata {
            duration: 42,
            ..Default::default()
        };
        session.complete_fetch("abc", audio(b"x"), Some(metadata));
        session.set_decoded_duration(Some(17.0));
        assert_eq!(session.display_duration(), 42);
    }

    #[test]
    fn display_duration_falls_back_to_timer() {
        let mut session = CaptureSession::new();
        session.begin_capture().unwrap();
        session.tick(100).unwrap();
        session.tick(100).unwrap();
        assert_eq!(session.display_duration(), 2);
        session.set_decoded_duration(Some(f64::NAN));
        assert_eq!(session.display_duration(), 2);
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(SessionState::Capturing.to_string(), "capturing");
        assert_eq!(SessionState::Shared.to_string(), "shared");
        assert_eq!(SessionState::Error.to_string(), "error");
    }

    #[test]
    fn error_display() {
        let err = InvalidStateTransition {
            current_state: SessionState::Uploading,
            action: "start capture".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("start capture"));
        assert!(msg.contains("uploading"));
    }
}
