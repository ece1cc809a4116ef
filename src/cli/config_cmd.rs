//! Config command handler

use url::Url;

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, RetryConfig};
use crate::domain::error::ConfigError;
use crate::domain::recording::{AudioMimeType, Duration};

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;

    let mut config = store.load().await?;
    apply_config_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;

    let config = store.load().await?;
    match config_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        let value = config_value(&config, key).unwrap_or_else(|| NOT_SET.to_string());
        presenter.key_value(key, &value);
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn ensure_known_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Read one key from a config file's contents
fn config_value(config: &AppConfig, key: &str) -> Option<String> {
    let retry = config.retry.as_ref();
    match key {
        "publisher_url" => config.publisher_url.clone(),
        "aggregator_url" => config.aggregator_url.clone(),
        "epochs" => config.epochs.map(|e| e.to_string()),
        "share_origin" => config.share_origin.clone(),
        "explorer_url" => config.explorer_url.clone(),
        "max_duration" => config.max_duration.clone(),
        "media_type" => config.media_type.clone(),
        "copy_link" => config.copy_link.map(|b| b.to_string()),
        "registry_path" => config.registry_path.clone(),
        "retry.enabled" => retry.and_then(|r| r.enabled).map(|b| b.to_string()),
        "retry.max_attempts" => retry.and_then(|r| r.max_attempts).map(|n| n.to_string()),
        "retry.initial_backoff_ms" => retry
            .and_then(|r| r.initial_backoff_ms)
            .map(|n| n.to_string()),
        _ => None,
    }
}

/// Validate `value` for `key` and store it in `config`
fn apply_config_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "publisher_url" => config.publisher_url = Some(parse_http_url(key, value)?),
        "aggregator_url" => config.aggregator_url = Some(parse_http_url(key, value)?),
        "share_origin" => config.share_origin = Some(parse_http_url(key, value)?),
        "explorer_url" => config.explorer_url = Some(parse_http_url(key, value)?),
        "epochs" => config.epochs = Some(parse_positive(key, value)?),
        "max_duration" => {
            value.parse::<Duration>().map_err(|e| invalid(key, e.to_string()))?;
            config.max_duration = Some(value.to_string());
        }
        "media_type" => {
            let media_type = value
                .parse::<AudioMimeType>()
                .map_err(|e| invalid(key, e.to_string()))?;
            config.media_type = Some(media_type.as_str().to_string());
        }
        "copy_link" => config.copy_link = Some(parse_bool_value(key, value)?),
        "registry_path" => {
            if value.trim().is_empty() {
                return Err(invalid(key, "Path must not be empty"));
            }
            config.registry_path = Some(value.to_string());
        }
        "retry.enabled" => retry_table(config).enabled = Some(parse_bool_value(key, value)?),
        "retry.max_attempts" => retry_table(config).max_attempts = Some(parse_positive(key, value)?),
        "retry.initial_backoff_ms" => {
            let ms = value
                .parse::<u64>()
                .map_err(|_| invalid(key, "Value must be a whole number of milliseconds"))?;
            retry_table(config).initial_backoff_ms = Some(ms);
        }
        _ => return ensure_known_key(key),
    }
    Ok(())
}

fn retry_table(config: &mut AppConfig) -> &mut RetryConfig {
    config.retry.get_or_insert_with(RetryConfig::default)
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_http_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid(key, format!("Invalid URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(key, "URL must use http or https"));
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_positive(key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(invalid(key, "Value must be a whole number of at least 1")),
    }
}

fn parse_bool_value(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).map_err(|_| invalid(key, "Value must be 'true' or 'false'"))
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}
