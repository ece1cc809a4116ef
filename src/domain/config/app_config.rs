//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::recording::{AudioMimeType, Duration};

pub const DEFAULT_PUBLISHER_URL: &str = "https://publisher.walrus-testnet.walrus.space";
pub const DEFAULT_AGGREGATOR_URL: &str = "https://aggregator.walrus-testnet.walrus.space";
pub const DEFAULT_SHARE_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_EXPLORER_URL: &str = "https://walruscan.com/testnet";
pub const DEFAULT_EPOCHS: u32 = 10;

/// Backoff around storage calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub enabled: Option<bool>,
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub publisher_url: Option<String>,
    pub aggregator_url: Option<String>,
    pub epochs: Option<u32>,
    pub share_origin: Option<String>,
    pub explorer_url: Option<String>,
    pub max_duration: Option<String>,
    pub media_type: Option<String>,
    pub copy_link: Option<bool>,
    pub registry_path: Option<String>,
    pub retry: Option<RetryConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            publisher_url: Some(DEFAULT_PUBLISHER_URL.to_string()),
            aggregator_url: Some(DEFAULT_AGGREGATOR_URL.to_string()),
            epochs: Some(DEFAULT_EPOCHS),
            share_origin: Some(DEFAULT_SHARE_ORIGIN.to_string()),
            explorer_url: Some(DEFAULT_EXPLORER_URL.to_string()),
            max_duration: Some("30m".to_string()),
            media_type: Some(AudioMimeType::Flac.as_str().to_string()),
            copy_link: Some(false),
            // Resolved against the data directory by the config store
            registry_path: None,
            retry: Some(RetryConfig {
                enabled: Some(false),
                max_attempts: Some(3),
                initial_backoff_ms: Some(500),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            publisher_url: other.publisher_url.or(self.publisher_url),
            aggregator_url: other.aggregator_url.or(self.aggregator_url),
            epochs: other.epochs.or(self.epochs),
            share_origin: other.share_origin.or(self.share_origin),
            explorer_url: other.explorer_url.or(self.explorer_url),
            max_duration: other.max_duration.or(self.max_duration),
            media_type: other.media_type.or(self.media_type),
            copy_link: other.copy_link.or(self.copy_link),
            registry_path: other.registry_path.or(self.registry_path),
            retry: Self::merge_retry_config(self.retry, other.retry),
        }
    }

    fn merge_retry_config(base: Option<RetryConfig>, other: Option<RetryConfig>) -> Option<RetryConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(RetryConfig {
                enabled: o.enabled.or(b.enabled),
                max_attempts: o.max_attempts.or(b.max_attempts),
                initial_backoff_ms: o.initial_backoff_ms.or(b.initial_backoff_ms),
            }),
        }
    }

    pub fn publisher_url_or_default(&self) -> &str {
        self.publisher_url.as_deref().unwrap_or(DEFAULT_PUBLISHER_URL)
    }

    pub fn aggregator_url_or_default(&self) -> &str {
        self.aggregator_url.as_deref().unwrap_or(DEFAULT_AGGREGATOR_URL)
    }

    /// Retention epochs; zero is treated as unset
    pub fn epochs_or_default(&self) -> u32 {
        self.epochs.filter(|e| *e >= 1).unwrap_or(DEFAULT_EPOCHS)
    }

    pub fn share_origin_or_default(&self) -> &str {
        self.share_origin.as_deref().unwrap_or(DEFAULT_SHARE_ORIGIN)
    }

    pub fn explorer_url_or_default(&self) -> &str {
        self.explorer_url.as_deref().unwrap_or(DEFAULT_EXPLORER_URL)
    }

    /// Get max_duration as parsed Duration, or default if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        self.max_duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_max_duration)
    }

    /// Get media type as parsed AudioMimeType, or FLAC if not set/invalid
    pub fn media_type_or_default(&self) -> AudioMimeType {
        self.media_type
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get copy_link setting, or false if not set
    pub fn copy_link_or_default(&self) -> bool {
        self.copy_link.unwrap_or(false)
    }

    pub fn retry_enabled_or_default(&self) -> bool {
        self.retry.as_ref().and_then(|r| r.enabled).unwrap_or(false)
    }

    pub fn retry_max_attempts_or_default(&self) -> u32 {
        self.retry
            .as_ref()
            .and_then(|r| r.max_attempts)
            .filter(|n| *n >= 1)
            .unwrap_or(3)
    }

    pub fn retry_initial_backoff_ms_or_default(&self) -> u64 {
        self.retry
            .as_ref()
            .and_then(|r| r.initial_backoff_ms)
            .unwrap_or(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.publisher_url_or_default(), DEFAULT_PUBLISHER_URL);
        assert_eq!(config.aggregator_url_or_default(), DEFAULT_AGGREGATOR_URL);
        assert_eq!(config.epochs, Some(10));
        assert_eq!(config.share_origin, Some("http://localhost:5173".to_string()));
        assert_eq!(config.max_duration, Some("30m".to_string()));
        assert_eq!(config.media_type, Some("audio/flac".to_string()));
        assert_eq!(config.copy_link, Some(false));
        assert!(config.registry_path.is_none());

        let retry = config.retry.as_ref().unwrap();
        assert_eq!(retry.enabled, Some(false));
        assert_eq!(retry.max_attempts, Some(3));
        assert_eq!(retry.initial_backoff_ms, Some(500));
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.publisher_url.is_none());
        assert!(config.epochs.is_none());
        assert!(config.copy_link.is_none());
        assert!(config.retry.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            publisher_url: Some("http://base".to_string()),
            epochs: Some(10),
            share_origin: Some("http://origin".to_string()),
            ..Default::default()
        };

        let other = AppConfig {
            publisher_url: Some("http://other".to_string()),
            epochs: None,
            share_origin: Some("https://share.example".to_string()),
            ..Default::default()
        };

        let merged = base.merge(other);

        assert_eq!(merged.publisher_url, Some("http://other".to_string()));
        assert_eq!(merged.epochs, Some(10));
        assert_eq!(merged.share_origin, Some("https://share.example".to_string()));
    }

    #[test]
    fn merge_preserves_base_when_other_is_none() {
        let base = AppConfig {
            aggregator_url: Some("http://agg".to_string()),
            copy_link: Some(true),
            ..Default::default()
        };

        let merged = base.merge(AppConfig::empty());

        assert_eq!(merged.aggregator_url, Some("http://agg".to_string()));
        assert_eq!(merged.copy_link, Some(true));
    }

    #[test]
    fn merge_retry_config() {
        let base = AppConfig::defaults();
        let other = AppConfig {
            retry: Some(RetryConfig {
                enabled: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = base.merge(other);
        assert!(merged.retry_enabled_or_default());
        assert_eq!(merged.retry_max_attempts_or_default(), 3);
        assert_eq!(merged.retry_initial_backoff_ms_or_default(), 500);
    }

    #[test]
    fn max_duration_or_default_parses() {
        let config = AppConfig {
            max_duration: Some("90s".to_string()),
            ..Default::default()
        };
        assert_eq!(config.max_duration_or_default().as_secs(), 90);
    }

    #[test]
    fn max_duration_or_default_uses_default_on_invalid() {
        let config = AppConfig {
            max_duration: Some("forever".to_string()),
            ..Default::default()
        };
        assert_eq!(config.max_duration_or_default().as_secs(), 1800);
        assert_eq!(AppConfig::empty().max_duration_or_default().as_secs(), 1800);
    }

    #[test]
    fn epochs_or_default_rejects_zero() {
        let config = AppConfig {
            epochs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.epochs_or_default(), 10);

        let config = AppConfig {
            epochs: Some(30),
            ..Default::default()
        };
        assert_eq!(config.epochs_or_default(), 30);
    }

    #[test]
    fn media_type_or_default() {
        let config = AppConfig {
            media_type: Some("audio/webm".to_string()),
            ..Default::default()
        };
        assert_eq!(config.media_type_or_default(), AudioMimeType::Webm);

        let config = AppConfig {
            media_type: Some("video/avi".to_string()),
            ..Default::default()
        };
        assert_eq!(config.media_type_or_default(), AudioMimeType::Flac);
    }

    #[test]
    fn boolean_defaults() {
        let config = AppConfig::empty();
        assert!(!config.copy_link_or_default());
        assert!(!config.retry_enabled_or_default());
    }

    #[test]
    fn deserializes_nested_retry_table() {
        let config: AppConfig = toml::from_str(
            r#"
            epochs = 30
            [retry]
            enabled = true
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.epochs_or_default(), 30);
        assert!(config.retry_enabled_or_default());
        assert_eq!(config.retry_max_attempts_or_default(), 5);
    }
}
