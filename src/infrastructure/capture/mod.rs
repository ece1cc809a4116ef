//! Microphone capture adapters

mod cpal_capture;
mod flac_encoder;

pub use cpal_capture::CpalCapture;
pub use flac_encoder::{encode_to_flac, EncodingError, PREFERRED_SAMPLE_RATE};
