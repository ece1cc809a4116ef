//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Whistle - record voice notes, store them on Walrus, share them by link
#[derive(Parser, Debug)]
#[command(name = "whistle")]
#[command(version)]
#[command(about = "Record voice notes, store them on Walrus, and share them by link")]
#[command(long_about = None)]
pub struct Cli {
    /// Show debug logs on stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Publisher used for uploads
    #[arg(long, value_name = "URL", global = true)]
    pub publisher_url: Option<String>,

    /// Aggregator used for reads
    #[arg(long, value_name = "URL", global = true)]
    pub aggregator_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record from the microphone and upload (Ctrl+C stops)
    Record(RecordArgs),
    /// Play a shared recording
    Play {
        /// Share link or blob id
        target: String,
    },
    /// Download a recording to a file
    Fetch {
        /// Share link or blob id
        target: String,
        /// Output file (defaults to <blob id>.<ext>)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// List saved recordings
    List,
    /// Print the share link for a recording
    Link {
        /// Blob id
        id: String,
    },
    /// Change the title of a saved recording
    Rename {
        /// Blob id
        id: String,
        /// New title
        title: String,
    },
    /// Remove a recording from the local list
    Delete {
        /// Blob id
        id: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `whistle record`
#[derive(Args, Debug, Clone, Default)]
pub struct RecordArgs {
    /// Title stored with the recording
    #[arg(short = 't', long)]
    pub title: Option<String>,

    /// Stop automatically after this long (e.g., 30s, 5m, 2m30s)
    #[arg(short = 'd', long, value_name = "TIME")]
    pub max_duration: Option<String>,

    /// Storage epochs to pay for
    #[arg(short = 'e', long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub epochs: Option<u32>,

    /// Play the recording back before uploading
    #[arg(short = 'p', long)]
    pub play: bool,

    /// Keep the recording local; do not upload
    #[arg(long, conflicts_with_all = ["copy", "show_receipt"])]
    pub no_upload: bool,

    /// Copy the share link to the clipboard
    #[arg(short = 'c', long)]
    pub copy: bool,

    /// Print the raw store response
    #[arg(long)]
    pub show_receipt: bool,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Options for a single record run, after config merging
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub title: Option<String>,
    pub play: bool,
    pub upload: bool,
    pub copy_link: bool,
    pub show_receipt: bool,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "publisher_url",
    "aggregator_url",
    "epochs",
    "share_origin",
    "explorer_url",
    "max_duration",
    "media_type",
    "copy_link",
    "registry_path",
    "retry.enabled",
    "retry.max_attempts",
    "retry.initial_backoff_ms",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
