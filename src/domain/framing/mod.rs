//! Blob framing: a JSON metadata line in front of the audio bytes

mod codec;
mod metadata;

pub use codec::{decode, encode, FramedBlob, FramingError, SCAN_WINDOW};
pub use metadata::Metadata;
