//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Use hours, minutes and seconds in that order (e.g., 45s, 5m, 2m30s, 1h)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when an unsupported audio MIME type is provided
#[derive(Debug, Clone, Error)]
#[error("Unsupported media type: \"{input}\". Valid types are: audio/flac, audio/ogg, audio/mp3, audio/mpeg, audio/wav, audio/webm, audio/mp4")]
pub struct MimeTypeParseError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
