//! Microphone capture using cpal
//!
//! The input stream lives on a dedicated thread because `cpal::Stream` is
//! not `Send`. The stream callback mixes to mono and pushes little-endian
//! i16 fragments into a shared buffer that the session drains every tick.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread::JoinHandle;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, SampleFormat, SampleRate, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::flac_encoder::{encode_to_flac, pcm_from_le_bytes, PREFERRED_SAMPLE_RATE};
use crate::application::ports::{CaptureDevice, CaptureError};
use crate::domain::recording::{AudioData, AudioMimeType};

type ChunkBuffer = Arc<StdMutex<Vec<Vec<u8>>>>;

/// Capture device backed by the default cpal input
pub struct CpalCapture {
    /// Fragments not yet drained
    pending: ChunkBuffer,
    /// Sample rate the device was opened at
    sample_rate: Arc<AtomicU32>,
    is_open: Arc<AtomicBool>,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

impl CpalCapture {
    /// Create a new cpal-based capture device
    pub fn new() -> Self {
        Self {
            pending: Arc::new(StdMutex::new(Vec::new())),
            sample_rate: Arc::new(AtomicU32::new(0)),
            is_open: Arc::new(AtomicBool::new(false)),
            worker: StdMutex::new(None),
        }
    }

    fn input_device() -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        host.default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into()))
    }

    /// Pick an i16/f32 config, preferring mono and 16kHz
    fn input_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), CaptureError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to get configs: {}", e)))?;

        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;

        for config in supported_configs {
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }

            let includes_preferred = config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE;

            let is_better = match &best_config {
                None => true,
                Some(current) => {
                    let fewer_channels = config.channels() < current.channels();
                    let better_rate =
                        includes_preferred && current.min_sample_rate().0 > PREFERRED_SAMPLE_RATE;
                    fewer_channels || better_rate
                }
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let config_range = best_config
            .ok_or_else(|| CaptureError::StartFailed("No suitable input config found".into()))?;

        let sample_rate = if config_range.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
            && config_range.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
        {
            SampleRate(PREFERRED_SAMPLE_RATE)
        } else {
            config_range.min_sample_rate()
        };

        let sample_format = config_range.sample_format();
        let config = StreamConfig {
            channels: config_range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok((config, sample_format))
    }

    /// Mix interleaved frames down to mono
    fn to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels <= 1 {
            return samples.to_vec();
        }

        samples
            .chunks(channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    }

    fn push_fragment(pending: &StdMutex<Vec<Vec<u8>>>, samples: &[i16], channels: u16) {
        let mono = Self::to_mono(samples, channels);
        if mono.is_empty() {
            return;
        }
        let bytes: Vec<u8> = mono.iter().flat_map(|s| s.to_le_bytes()).collect();
        if let Ok(mut buffer) = pending.lock() {
            buffer.push(bytes);
        }
    }

    fn build_stream(
        pending: ChunkBuffer,
        is_open: Arc<AtomicBool>,
    ) -> Result<(cpal::Stream, u32), CaptureError> {
        let device = Self::input_device()?;
        let (config, sample_format) = Self::input_config(&device)?;
        let channels = config.channels;
        let on_error = |err| warn!(error = %err, "audio input stream error");

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if is_open.load(Ordering::SeqCst) {
                        Self::push_fragment(&pending, data, channels);
                    }
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if is_open.load(Ordering::SeqCst) {
                        let i16_data: Vec<i16> =
                            data.iter().map(|&s| (s * 32767.0) as i16).collect();
                        Self::push_fragment(&pending, &i16_data, channels);
                    }
                },
                on_error,
                None,
            ),
            other => {
                return Err(CaptureError::StartFailed(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        let stream = stream.map_err(|e| match e {
            BuildStreamError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable("input device not available".into())
            }
            other => CaptureError::StartFailed(other.to_string()),
        })?;

        Ok((stream, config.sample_rate.0))
    }

    fn take_pending(&self) -> Vec<Vec<u8>> {
        self.pending
            .lock()
            .map(|mut buffer| std::mem::take(&mut *buffer))
            .unwrap_or_default()
    }

    fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker.lock().ok().and_then(|mut worker| worker.take())
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureDevice for CpalCapture {
    async fn open(&self) -> Result<(), CaptureError> {
        if self.is_open.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::StartFailed("Capture already in progress".into()));
        }
        self.take_pending();

        let (ready_tx, ready_rx) = oneshot::channel();
        let pending = Arc::clone(&self.pending);
        let is_open = Arc::clone(&self.is_open);
        let sample_rate = Arc::clone(&self.sample_rate);

        let handle = std::thread::spawn(move || {
            let stream = match CpalCapture::build_stream(pending, Arc::clone(&is_open)) {
                Ok((stream, rate)) => {
                    sample_rate.store(rate, Ordering::SeqCst);
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(CaptureError::StartFailed(e.to_string())));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            // Keep the stream alive until closed
            while is_open.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            drop(stream);
        });

        if let Ok(mut worker) = self.worker.lock() {
            *worker = Some(handle);
        }

        let opened = match ready_rx.await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::StartFailed("capture thread exited".into())),
        };
        match opened {
            Ok(()) => {
                debug!(
                    sample_rate = self.sample_rate.load(Ordering::SeqCst),
                    "input stream opened"
                );
                Ok(())
            }
            Err(e) => {
                self.is_open.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn drain_chunks(&self) -> Vec<Vec<u8>> {
        self.take_pending()
    }

    async fn close(&self) -> Result<Vec<Vec<u8>>, CaptureError> {
        let was_open = self.is_open.swap(false, Ordering::SeqCst);

        if let Some(handle) = self.take_worker() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| CaptureError::CaptureFailed(format!("Task join error: {}", e)))?
                .map_err(|_| CaptureError::CaptureFailed("capture thread panicked".into()))?;
        }

        if !was_open {
            return Ok(Vec::new());
        }
        debug!("input stream closed");
        Ok(self.take_pending())
    }

    async fn assemble(&self, chunks: &[Vec<u8>]) -> Result<AudioData, CaptureError> {
        let sample_rate = self.sample_rate.load(Ordering::SeqCst);
        if sample_rate == 0 {
            return Err(CaptureError::EncodeFailed("Sample rate not set".into()));
        }

        let bytes = chunks.concat();
        let flac = tokio::task::spawn_blocking(move || {
            let samples = pcm_from_le_bytes(&bytes);
            encode_to_flac(&samples, sample_rate)
        })
        .await
        .map_err(|e| CaptureError::EncodeFailed(format!("Encode task error: {}", e)))?
        .map_err(|e| CaptureError::EncodeFailed(e.to_string()))?;

        Ok(AudioData::new(flac, AudioMimeType::Flac))
    }

    fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }
}
