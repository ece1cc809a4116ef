//! Rodio-based audio output
//!
//! `OutputStream` is not `Send`, so a keeper thread owns it for as long as
//! the device is held; only the `Send` handle and sinks live here.

use std::io::Cursor;
use std::sync::mpsc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use rodio::source::{Source, Zero};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tracing::debug;

use crate::application::ports::{AudioOutput, PlaybackError};
use crate::domain::recording::AudioData;

/// Length of the silent unlock sample
const UNLOCK_SAMPLE_MS: u64 = 50;

struct OutputDevice {
    handle: OutputStreamHandle,
    // Dropping the sender stops the keeper thread
    _shutdown: mpsc::Sender<()>,
}

/// Audio output on the default rodio device
pub struct RodioOutput {
    device: StdMutex<Option<OutputDevice>>,
    sink: StdMutex<Option<Sink>>,
    prepared: StdMutex<Option<Vec<u8>>>,
}

impl RodioOutput {
    pub fn new() -> Self {
        Self {
            device: StdMutex::new(None),
            sink: StdMutex::new(None),
            prepared: StdMutex::new(None),
        }
    }

    /// Open the device on a keeper thread
    fn open_device() -> Result<OutputDevice, PlaybackError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        std::thread::spawn(move || match OutputStream::try_default() {
            Ok((stream, handle)) => {
                let _ = ready_tx.send(Ok(handle));
                // Blocks until the sender is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e.to_string()));
            }
        });

        let handle = ready_rx
            .recv()
            .map_err(|_| PlaybackError::DeviceUnavailable("output thread exited".into()))?
            .map_err(PlaybackError::DeviceUnavailable)?;

        Ok(OutputDevice {
            handle,
            _shutdown: shutdown_tx,
        })
    }

    async fn handle(&self) -> Result<OutputStreamHandle, PlaybackError> {
        let existing = self
            .device
            .lock()
            .ok()
            .and_then(|device| device.as_ref().map(|d| d.handle.clone()));
        if let Some(handle) = existing {
            return Ok(handle);
        }

        let device = tokio::task::spawn_blocking(Self::open_device)
            .await
            .map_err(|e| PlaybackError::DeviceUnavailable(format!("Task join error: {}", e)))??;
        let handle = device.handle.clone();
        if let Ok(mut slot) = self.device.lock() {
            *slot = Some(device);
        }
        debug!("audio output opened");
        Ok(handle)
    }

    fn decode(bytes: Vec<u8>) -> Result<Decoder<Cursor<Vec<u8>>>, PlaybackError> {
        Decoder::new(Cursor::new(bytes)).map_err(|e| PlaybackError::DecodeFailed(e.to_string()))
    }

    fn stop_sink(&self) {
        if let Some(sink) = self.sink.lock().ok().and_then(|mut s| s.take()) {
            sink.stop();
        }
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn unlock(&self) -> Result<(), PlaybackError> {
        let handle = self.handle().await?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
        sink.append(Zero::<f32>::new(1, 44100).take_duration(Duration::from_millis(UNLOCK_SAMPLE_MS)));
        sink.detach();
        Ok(())
    }

    async fn prepare(&self, audio: &AudioData) -> Result<Option<f64>, PlaybackError> {
        let bytes = audio.data().to_vec();
        let decoder = Self::decode(bytes.clone())?;
        let duration = decoder.total_duration().map(|d| d.as_secs_f64());

        self.stop_sink();
        if let Ok(mut prepared) = self.prepared.lock() {
            *prepared = Some(bytes);
        }
        Ok(duration)
    }

    async fn start(&self, volume: f32) -> Result<(), PlaybackError> {
        let bytes = self
            .prepared
            .lock()
            .ok()
            .and_then(|p| p.clone())
            .ok_or(PlaybackError::NothingLoaded)?;

        let handle = self.handle().await?;
        let decoder = Self::decode(bytes)?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
        sink.set_volume(volume.clamp(0.0, 1.0));
        sink.append(decoder);
        sink.play();

        self.stop_sink();
        if let Ok(mut slot) = self.sink.lock() {
            *slot = Some(sink);
        }
        Ok(())
    }

    fn pause(&self) {
        if let Ok(sink) = self.sink.lock() {
            if let Some(sink) = sink.as_ref() {
                sink.pause();
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.sink
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(Sink::empty))
            .unwrap_or(true)
    }

    fn release(&self) {
        self.stop_sink();
        if let Ok(mut prepared) = self.prepared.lock() {
            *prepared = None;
        }
        if let Ok(mut device) = self.device.lock() {
            *device = None;
        }
    }
}
