//! Command runners
//!
//! Wires the adapters into a `RecordingSession` and drives it for each
//! subcommand. Everything user-facing goes through the `Presenter`.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration as StdDuration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::application::ports::{BlobStore, Clipboard, ConfigStore, RegistryError};
use crate::application::{
    PlaybackController, PlaybackState, RecordingRegistry, RecordingSession, SessionConfig,
    SessionError,
};
use crate::domain::config::AppConfig;
use crate::domain::receipt::StoreOutcome;
use crate::domain::recording::{format_clock, DescriptorPatch};
use crate::domain::share;
use crate::infrastructure::{
    default_registry_path, ArboardClipboard, CpalCapture, JsonFileRegistry, RetryingStore,
    RodioOutput, WalrusStore, XdgConfigStore,
};

use super::args::RecordOptions;
use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Environment overrides
pub const ENV_PUBLISHER_URL: &str = "WHISTLE_PUBLISHER_URL";
pub const ENV_AGGREGATOR_URL: &str = "WHISTLE_AGGREGATOR_URL";
pub const ENV_EPOCHS: &str = "WHISTLE_EPOCHS";

/// How often a playing recording is checked for completion
const PLAYBACK_POLL: StdDuration = StdDuration::from_millis(200);

/// Session wired to the real adapters
pub type CliSession =
    RecordingSession<CpalCapture, Box<dyn BlobStore>, RodioOutput, JsonFileRegistry>;

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %store.path().display(), error = %e, "ignoring unreadable config file");
            AppConfig::empty()
        }
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config())
        .merge(cli_config)
}

/// Config layer read from `WHISTLE_*` variables
pub fn env_config() -> AppConfig {
    config_from_env(|key| env::var(key).ok())
}

fn config_from_env(lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
    let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

    let epochs = var(ENV_EPOCHS).and_then(|raw| match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Some(n),
        _ => {
            warn!(value = %raw, "ignoring invalid {}", ENV_EPOCHS);
            None
        }
    });

    AppConfig {
        publisher_url: var(ENV_PUBLISHER_URL),
        aggregator_url: var(ENV_AGGREGATOR_URL),
        epochs,
        ..Default::default()
    }
}

/// Walrus client, wrapped in backoff when `retry.enabled` is set
pub fn build_store(config: &AppConfig) -> Box<dyn BlobStore> {
    let walrus = WalrusStore::new(
        config.publisher_url_or_default(),
        config.aggregator_url_or_default(),
    )
    .with_media_type(config.media_type_or_default());

    if config.retry_enabled_or_default() {
        debug!(
            attempts = config.retry_max_attempts_or_default(),
            "storage retries enabled"
        );
        Box::new(RetryingStore::new(
            walrus,
            config.retry_max_attempts_or_default(),
            StdDuration::from_millis(config.retry_initial_backoff_ms_or_default()),
        ))
    } else {
        Box::new(walrus)
    }
}

/// Where the recording list lives
pub fn registry_path(config: &AppConfig) -> PathBuf {
    config
        .registry_path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(default_registry_path)
}

pub async fn open_registry(
    config: &AppConfig,
) -> Result<RecordingRegistry<JsonFileRegistry>, RegistryError> {
    RecordingRegistry::open(JsonFileRegistry::new(registry_path(config))).await
}

pub async fn build_session(config: &AppConfig) -> Result<CliSession, RegistryError> {
    let registry = open_registry(config).await?;
    let session_config = SessionConfig {
        max_duration: config.max_duration_or_default(),
        epochs: config.epochs_or_default(),
        share_origin: config.share_origin_or_default().to_string(),
    };

    Ok(RecordingSession::new(
        CpalCapture::new(),
        build_store(config),
        PlaybackController::new(RodioOutput::new()),
        registry,
        session_config,
    ))
}

/// Record, optionally play back, then upload and share
pub async fn run_record(options: RecordOptions, config: &AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();

    let session = match build_session(config).await {
        Ok(session) => session,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let shutdown = ShutdownSignal::new();
    shutdown.setup();

    if let Err(e) = session.start_capture().await {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    let max_secs = session.config().max_duration.as_secs();
    presenter.start_spinner("Recording...");
    presenter.update_recording_progress(0, max_secs);

    if let Err(e) = capture_until_stopped(&session, &shutdown, &presenter).await {
        presenter.spinner_fail(&e.to_string());
        session.reset().await;
        return ExitCode::from(EXIT_ERROR);
    }

    let snapshot = session.snapshot().await;
    let size = session
        .payload()
        .await
        .map(|p| p.human_readable_size())
        .unwrap_or_default();
    presenter.spinner_success(&format!(
        "Recorded {} ({})",
        format_clock(snapshot.duration_seconds as f64),
        size
    ));

    if options.play {
        let playback_signal = ShutdownSignal::new();
        playback_signal.setup();
        if let Err(e) = play_current(&session, &playback_signal, &mut presenter, "recording").await
        {
            presenter.warn(&format!("Playback skipped: {}", e));
        }
    }

    if !options.upload {
        presenter.info("Upload skipped; the recording was not stored");
        session.reset().await;
        return ExitCode::from(EXIT_SUCCESS);
    }

    presenter.start_spinner("Uploading to Walrus...");
    let upload_signal = ShutdownSignal::new();
    upload_signal.setup();

    let saved = tokio::select! {
        saved = session.save(options.title.as_deref()) => saved,
        _ = upload_signal.wait() => {
            presenter.spinner_fail("Upload cancelled");
            session.reset().await;
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let outcome = match saved {
        Ok(outcome) => outcome,
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    presenter.spinner_success(&format!(
        "Stored \"{}\" for {} epochs",
        outcome.descriptor.title,
        session.config().epochs
    ));
    if outcome.receipt.outcome == StoreOutcome::AlreadyCertified {
        presenter.info("Identical audio was already stored; reusing its id");
    }
    if let Some(e) = &outcome.registry_error {
        presenter.warn(&format!("Recording is stored but missing from the local list: {}", e));
    }

    presenter.output(&outcome.share_link);
    presenter.info(&format!(
        "Explorer: {}",
        outcome.receipt.explorer_url(config.explorer_url_or_default())
    ));
    if options.show_receipt {
        presenter.output(&outcome.receipt.pretty());
    }

    if options.copy_link {
        match ArboardClipboard::new().copy(&outcome.share_link).await {
            Ok(()) => presenter.info("Link copied to clipboard"),
            Err(e) => presenter.warn(&format!("Could not copy link: {}", e)),
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Tick once a second until Ctrl+C or the cap stops the capture
async fn capture_until_stopped(
    session: &CliSession,
    shutdown: &ShutdownSignal,
    presenter: &Presenter,
) -> Result<(), SessionError> {
    let max_secs = session.config().max_duration.as_secs();
    let mut ticker = tokio::time::interval(StdDuration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if session.tick().await? {
                    return Ok(());
                }
                let elapsed = session.snapshot().await.elapsed_seconds;
                presenter.update_recording_progress(elapsed, max_secs);
            }
            _ = shutdown.wait() => break,
        }
    }

    session.stop_capture().await
}

/// Play whatever the session holds and wait for it to end or for Ctrl+C
async fn play_current(
    session: &CliSession,
    shutdown: &ShutdownSignal,
    presenter: &mut Presenter,
    label: &str,
) -> Result<(), SessionError> {
    if let Err(e) = session.play().await {
        presenter.stop_spinner();
        return Err(e);
    }

    let clock = format_clock(session.display_duration().await as f64);
    presenter.start_spinner(&format!("Playing {} ({})  (Ctrl+C to stop)", label, clock));

    let mut poll = tokio::time::interval(PLAYBACK_POLL);
    loop {
        tokio::select! {
            _ = poll.tick() => {
                if session.playback_state().await == PlaybackState::Stopped {
                    presenter.spinner_success(&format!("Played {} ({})", label, clock));
                    return Ok(());
                }
            }
            _ = shutdown.wait() => {
                session.pause().await;
                presenter.spinner_success("Playback stopped");
                return Ok(());
            }
        }
    }
}

/// Fetch a shared recording and play it
pub async fn run_play(target: &str, config: &AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();

    let Some(blob_id) = share::parse_share_target(target) else {
        presenter.error(&format!("Not a share link or blob id: {}", target));
        return ExitCode::from(EXIT_USAGE_ERROR);
    };

    let session = match build_session(config).await {
        Ok(session) => session,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let shutdown = ShutdownSignal::new();
    shutdown.setup();

    if let Err(e) = session.load(&blob_id, false).await {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    presenter.start_spinner("Fetching recording...");
    let label = session
        .registry()
        .get(&blob_id)
        .await
        .map(|d| d.title)
        .filter(|t| !t.is_empty());

    let label = label.as_deref().unwrap_or(&blob_id);
    let code = match play_current(&session, &shutdown, &mut presenter, label).await {
        Ok(()) => EXIT_SUCCESS,
        Err(SessionError::AutoplayBlocked) => {
            presenter.error("Playback was blocked by the audio device. Run the command again.");
            EXIT_ERROR
        }
        Err(e) => {
            presenter.error(&e.to_string());
            EXIT_ERROR
        }
    };

    session.reset().await;
    ExitCode::from(code)
}

/// Download a recording, strip its metadata line, and write the audio to disk
pub async fn run_fetch(target: &str, output: Option<PathBuf>, config: &AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();

    let Some(blob_id) = share::parse_share_target(target) else {
        presenter.error(&format!("Not a share link or blob id: {}", target));
        return ExitCode::from(EXIT_USAGE_ERROR);
    };

    let session = match build_session(config).await {
        Ok(session) => session,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    presenter.start_spinner("Fetching recording...");
    if let Err(e) = session.load(&blob_id, true).await {
        presenter.spinner_fail(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    let Some(payload) = session.payload().await else {
        presenter.spinner_fail("Nothing was fetched");
        return ExitCode::from(EXIT_ERROR);
    };

    let path = output
        .unwrap_or_else(|| default_output_path(&blob_id, payload.mime_type().extension()));
    if let Err(e) = tokio::fs::write(&path, payload.data()).await {
        presenter.spinner_fail(&format!("Failed to write {}: {}", path.display(), e));
        return ExitCode::from(EXIT_ERROR);
    }
    presenter.spinner_success(&format!(
        "Saved {} to {}",
        payload.human_readable_size(),
        path.display()
    ));

    match session.metadata().await {
        Some(metadata) => {
            presenter.key_value("title", &metadata.title);
            presenter.key_value("recorded", &metadata.timestamp_with_tz);
            presenter.key_value(
                "duration",
                &format_clock(session.display_duration().await as f64),
            );
        }
        None => presenter.info("The recording carries no metadata"),
    }

    ExitCode::from(EXIT_SUCCESS)
}

fn default_output_path(blob_id: &str, extension: &str) -> PathBuf {
    Path::new(".").join(format!("{}.{}", blob_id, extension))
}

/// Print the local recording list, newest first
pub async fn run_list(config: &AppConfig) -> ExitCode {
    let presenter = Presenter::new();

    let registry = match open_registry(config).await {
        Ok(registry) => registry,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let entries = registry.list().await;
    if entries.is_empty() {
        presenter.info("No recordings yet. Run `whistle record` to make one.");
    }
    for descriptor in &entries {
        presenter.recording_row(descriptor);
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Print the share link for an id or link
pub async fn run_link(id: &str, config: &AppConfig) -> ExitCode {
    let presenter = Presenter::new();

    let Some(blob_id) = share::parse_share_target(id) else {
        presenter.error(&format!("Not a share link or blob id: {}", id));
        return ExitCode::from(EXIT_USAGE_ERROR);
    };

    presenter.output(&share::share_link(config.share_origin_or_default(), &blob_id));
    presenter.info(&format!(
        "Explorer: {}",
        share::explorer_link(config.explorer_url_or_default(), &blob_id)
    ));

    ExitCode::from(EXIT_SUCCESS)
}

pub async fn run_rename(id: &str, title: &str, config: &AppConfig) -> ExitCode {
    let presenter = Presenter::new();

    let title = title.trim();
    if title.is_empty() {
        presenter.error("Title must not be empty");
        return ExitCode::from(EXIT_USAGE_ERROR);
    }

    let result = match open_registry(config).await {
        Ok(registry) => registry.update(id, &DescriptorPatch::title(title)).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => {
            presenter.success(&format!("Renamed {} to \"{}\"", id, title));
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(false) => {
            presenter.info("Title unchanged");
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

pub async fn run_delete(id: &str, config: &AppConfig) -> ExitCode {
    let presenter = Presenter::new();

    let result = match open_registry(config).await {
        Ok(registry) => registry.remove(id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => {
            presenter.success(&format!("Removed {} from the list", id));
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(false) => {
            presenter.error(&format!("No recording with id {}", id));
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}
