//! Recording domain module

mod audio_data;
mod descriptor;
mod duration;
mod playtime;

pub use audio_data::{AudioData, AudioMimeType};
pub use descriptor::{DescriptorPatch, RecordingDescriptor};
pub use duration::{Duration, DEFAULT_MAX_DURATION_SECS};
pub use playtime::{format_clock, resolve_duration};
