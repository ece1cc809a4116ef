//! Framed blob codec
//!
//! Layout: one compact JSON metadata line, a single `\n`, then the raw audio
//! bytes with no further delimiter. Blobs without a parseable line inside the
//! scan window are treated as bare payloads (the unframed legacy format).

use thiserror::Error;

use super::metadata::Metadata;

/// How far into a blob the decoder looks for the metadata terminator
pub const SCAN_WINDOW: usize = 1024;

const NEWLINE: u8 = b'\n';

/// Encoding errors
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Metadata line is {len} bytes; it must be shorter than {max}")]
    MetadataTooLarge { len: usize, max: usize },
}

/// A decoded blob: optional metadata plus the audio bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedBlob {
    pub metadata: Option<Metadata>,
    pub payload: Vec<u8>,
}

impl FramedBlob {
    /// Wrap a payload with metadata
    pub fn new(metadata: Metadata, payload: Vec<u8>) -> Self {
        Self {
            metadata: Some(metadata),
            payload,
        }
    }

    /// Serialize to the stored representation
    pub fn to_bytes(&self) -> Result<Vec<u8>, FramingError> {
        match &self.metadata {
            Some(metadata) => encode(&self.payload, metadata),
            None => Ok(self.payload.clone()),
        }
    }
}

/// Prefix `payload` with the metadata line
pub fn encode(payload: &[u8], metadata: &Metadata) -> Result<Vec<u8>, FramingError> {
    // Compact output escapes control characters, so the line holds no raw newline
    let line = serde_json::to_vec(metadata)?;
    if line.len() >= SCAN_WINDOW {
        return Err(FramingError::MetadataTooLarge {
            len: line.len(),
            max: SCAN_WINDOW,
        });
    }

    let mut out = Vec::with_capacity(line.len() + 1 + payload.len());
    out.extend_from_slice(&line);
    out.push(NEWLINE);
    out.extend_from_slice(payload);
    Ok(out)
}

/// Split a stored blob into metadata and payload.
///
/// Never fails: anything that does not look like a framed blob comes back
/// whole as the payload with `metadata == None`.
pub fn decode(blob: &[u8]) -> FramedBlob {
    let window = &blob[..blob.len().min(SCAN_WINDOW)];

    let Some(split) = window.iter().position(|&b| b == NEWLINE) else {
        return legacy(blob);
    };

    match serde_json::from_slice::<Metadata>(&blob[..split]) {
        Ok(metadata) => FramedBlob {
            metadata: Some(metadata),
            payload: blob[split + 1..].to_vec(),
        },
        Err(e) => {
            tracing::debug!("no metadata line in blob ({}), using unframed payload", e);
            legacy(blob)
        }
    }
}

fn legacy(blob: &[u8]) -> FramedBlob {
    FramedBlob {
        metadata: None,
        payload: blob.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> Metadata {
        Metadata {
            title: "My Clip".to_string(),
            timestamp: "2026-05-01T10:00:00.000Z".to_string(),
            timestamp_with_tz: "2026-05-01 12:00:00 +02:00".to_string(),
            duration: 42,
        }
    }

    #[test]
    fn round_trip_preserves_payload_and_metadata() {
        let payloads: [&[u8]; 4] = [b"", b"fLaC\x00\x01", b"\n\n\nlines\n", &[0xff; 4096]];
        for payload in payloads {
            let encoded = encode(payload, &metadata()).unwrap();
            let decoded = decode(&encoded);
            assert_eq!(decoded.metadata, Some(metadata()));
            assert_eq!(decoded.payload, payload);
        }

        for duration in [0, (1u64 << 53) + 1, u64::MAX] {
            let m = Metadata {
                duration,
                ..metadata()
            };
            let decoded = decode(&encode(b"audio", &m).unwrap());
            assert_eq!(decoded.metadata, Some(m));
        }
    }

    #[test]
    fn newline_in_title_is_escaped() {
        let m = Metadata {
            title: "two\nlines".to_string(),
            ..metadata()
        };
        let encoded = encode(b"audio", &m).unwrap();
        assert_eq!(encoded.iter().filter(|&&b| b == b'\n').count(), 1);
        assert_eq!(decode(&encoded).metadata, Some(m));
    }

    #[test]
    fn encoded_layout() {
        let encoded = encode(b"AUDIO", &metadata()).unwrap();
        let newline = encoded.iter().position(|&b| b == b'\n').unwrap();
        assert_eq!(encoded[0], b'{');
        assert_eq!(&encoded[newline + 1..], b"AUDIO");
    }

    #[test]
    fn no_newline_in_window_is_legacy() {
        let mut blob = vec![b'x'; SCAN_WINDOW];
        blob.extend_from_slice(b"\n{}");
        let decoded = decode(&blob);
        assert!(decoded.metadata.is_none());
        assert_eq!(decoded.payload, blob);
    }

    #[test]
    fn unparseable_prefix_is_legacy() {
        let blob = b"ID3\x03 not json\nrest of the mp3".to_vec();
        let decoded = decode(&blob);
        assert!(decoded.metadata.is_none());
        assert_eq!(decoded.payload, blob);
    }

    #[test]
    fn non_object_json_is_legacy() {
        let blob = b"12345\npayload".to_vec();
        assert!(decode(&blob).metadata.is_none());
    }

    #[test]
    fn empty_blob() {
        let decoded = decode(&[]);
        assert!(decoded.metadata.is_none());
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn oversized_metadata_is_rejected() {
        let m = Metadata {
            title: "t".repeat(SCAN_WINDOW),
            ..metadata()
        };
        assert!(matches!(
            encode(b"a", &m),
            Err(FramingError::MetadataTooLarge { .. })
        ));
    }

    #[test]
    fn framed_blob_to_bytes() {
        let blob = FramedBlob::new(metadata(), b"pcm".to_vec());
        assert_eq!(decode(&blob.to_bytes().unwrap()), blob);

        let bare = FramedBlob {
            metadata: None,
            payload: b"raw".to_vec(),
        };
        assert_eq!(bare.to_bytes().unwrap(), b"raw");
    }
}
