//! Configuration domain module

mod app_config;

pub use app_config::{
    AppConfig, RetryConfig, DEFAULT_AGGREGATOR_URL, DEFAULT_EPOCHS, DEFAULT_EXPLORER_URL,
    DEFAULT_PUBLISHER_URL, DEFAULT_SHARE_ORIGIN,
};
