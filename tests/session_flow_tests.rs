//! End-to-end session flow: scripted capture, mock Walrus endpoints,
//! and the JSON file registry on disk

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use whistle::application::ports::{AudioOutput, CaptureDevice, CaptureError, PlaybackError};
use whistle::application::{
    PlaybackController, RecordingRegistry, RecordingSession, SessionConfig, SessionError,
};
use whistle::domain::framing;
use whistle::domain::recording::{AudioData, AudioMimeType, Duration};
use whistle::domain::session::SessionState;
use whistle::infrastructure::{JsonFileRegistry, RetryingStore, WalrusStore};

const BLOB_ID: &str = "M4hsZGQ1oCktdzegB6HnI6Mi28S2nqOPHxK-W7_4BUk";

/// Yields one fragment per drain
#[derive(Default)]
struct ScriptedCapture {
    open: AtomicBool,
    drains: AtomicU32,
}

#[async_trait]
impl CaptureDevice for ScriptedCapture {
    async fn open(&self) -> Result<(), CaptureError> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn drain_chunks(&self) -> Vec<Vec<u8>> {
        let n = self.drains.fetch_add(1, Ordering::SeqCst);
        vec![format!("frame-{n};").into_bytes()]
    }

    async fn close(&self) -> Result<Vec<Vec<u8>>, CaptureError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(vec![b"tail".to_vec()])
    }

    async fn assemble(&self, chunks: &[Vec<u8>]) -> Result<AudioData, CaptureError> {
        Ok(AudioData::new(chunks.concat(), AudioMimeType::Flac))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Output that finishes instantly
#[derive(Default)]
struct SilentOutput {
    starts: AtomicU32,
}

#[async_trait]
impl AudioOutput for SilentOutput {
    async fn unlock(&self) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn prepare(&self, _audio: &AudioData) -> Result<Option<f64>, PlaybackError> {
        Ok(Some(2.4))
    }

    async fn start(&self, _volume: f32) -> Result<(), PlaybackError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {}

    fn is_finished(&self) -> bool {
        true
    }

    fn release(&self) {}
}

type Session<S> = RecordingSession<ScriptedCapture, S, SilentOutput, JsonFileRegistry>;

async fn session_with<S: whistle::application::ports::BlobStore>(
    store: S,
    dir: &TempDir,
) -> Session<S> {
    let registry = RecordingRegistry::open(JsonFileRegistry::new(dir.path().join("recordings.json")))
        .await
        .unwrap();
    RecordingSession::new(
        ScriptedCapture::default(),
        store,
        PlaybackController::new(SilentOutput::default()),
        registry,
        SessionConfig {
            max_duration: Duration::from_secs(60),
            epochs: 3,
            share_origin: "https://share.example".to_string(),
        },
    )
}

async fn record_two_seconds<S: whistle::application::ports::BlobStore>(session: &Session<S>) {
    session.start_capture().await.unwrap();
    assert!(!session.tick().await.unwrap());
    assert!(!session.tick().await.unwrap());
    session.stop_capture().await.unwrap();
}

fn certified() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"alreadyCertified": {"blobId": BLOB_ID}}))
}

#[tokio::test]
async fn record_share_and_replay_through_walrus() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/blobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "newlyCreated": {"blobObject": {"blobId": BLOB_ID}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let writer = session_with(WalrusStore::new(server.uri(), server.uri()), &dir).await;
    record_two_seconds(&writer).await;

    let outcome = writer.save(Some("  Standup notes  ")).await.unwrap();
    assert_eq!(outcome.share_link, format!("https://share.example/#{BLOB_ID}"));
    assert_eq!(outcome.descriptor.title, "Standup notes");
    assert_eq!(outcome.descriptor.duration_seconds, 2);
    assert_eq!(writer.state().await, SessionState::Shared);

    // The uploaded blob is a metadata line followed by the captured bytes
    let requests = server.received_requests().await.unwrap();
    let uploaded = requests[0].body.clone();
    let framed = framing::decode(&uploaded);
    assert_eq!(framed.payload, b"frame-0;frame-1;tail");
    let metadata = framed.metadata.unwrap();
    assert_eq!(metadata.title, "Standup notes");
    assert_eq!(metadata.duration, 2);

    Mock::given(method("GET"))
        .and(path(format!("/v1/blobs/{BLOB_ID}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(uploaded),
        )
        .expect(1)
        .mount(&server)
        .await;

    // A second process opens the same registry and follows the link lazily
    let reader = session_with(WalrusStore::new(server.uri(), server.uri()), &dir).await;
    let listed = reader.registry().list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, BLOB_ID);

    reader.load(BLOB_ID, false).await.unwrap();
    assert!(reader.payload().await.is_none());

    reader.play().await.unwrap();
    reader.play().await.unwrap();

    assert_eq!(reader.payload().await.unwrap().data(), b"frame-0;frame-1;tail");
    let snapshot = reader.snapshot().await;
    assert_eq!(snapshot.title.as_deref(), Some("Standup notes"));
    assert_eq!(snapshot.duration_seconds, 2);
}

#[tokio::test]
async fn failed_upload_keeps_payload_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT")).respond_with(certified()).mount(&server).await;

    let dir = TempDir::new().unwrap();
    let session = session_with(WalrusStore::new(server.uri(), server.uri()), &dir).await;
    record_two_seconds(&session).await;

    let err = session.save(None).await.unwrap_err();
    assert!(matches!(err, SessionError::UploadFailed(_)));
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Error);
    assert!(snapshot.has_payload);
    assert!(session.registry().list().await.is_empty());

    let outcome = session.save(None).await.unwrap();
    assert_eq!(outcome.receipt.blob_id, BLOB_ID);
    assert!(outcome.descriptor.title.starts_with("Recording "));
    assert_eq!(session.registry().list().await.len(), 1);
}

#[tokio::test]
async fn retrying_store_hides_transient_publisher_errors() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT")).respond_with(certified()).mount(&server).await;

    let dir = TempDir::new().unwrap();
    let store = RetryingStore::new(
        WalrusStore::new(server.uri(), server.uri()),
        3,
        StdDuration::from_millis(1),
    );
    let session = session_with(store, &dir).await;
    record_two_seconds(&session).await;

    let outcome = session.save(Some("Retry")).await.unwrap();
    assert_eq!(outcome.receipt.blob_id, BLOB_ID);
    assert_eq!(session.state().await, SessionState::Shared);
}

#[tokio::test]
async fn missing_blob_surfaces_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/blobs/.+$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = session_with(WalrusStore::new(server.uri(), server.uri()), &dir).await;
    session.load("gone", false).await.unwrap();

    let err = session.play().await.unwrap_err();
    assert!(matches!(err, SessionError::FetchFailed(_)));
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.state, SessionState::Error);
    assert_eq!(snapshot.blob_id, "gone");
    assert!(snapshot.error_message.is_some());
}

#[tokio::test]
async fn legacy_blob_plays_without_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/blobs/legacy"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fLaC raw payload".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = session_with(WalrusStore::new(server.uri(), server.uri()), &dir).await;
    session.load("legacy", true).await.unwrap();

    assert!(session.metadata().await.is_none());
    assert_eq!(session.payload().await.unwrap().data(), b"fLaC raw payload");

    session.play().await.unwrap();
    // Decoder length is used when no metadata is present
    assert_eq!(session.display_duration().await, 2);
}
