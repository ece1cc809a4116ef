//! Whistle CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use whistle::cli::{
    app::{
        load_merged_config, run_delete, run_fetch, run_link, run_list, run_play, run_record,
        run_rename, EXIT_ERROR, EXIT_USAGE_ERROR,
    },
    args::{Cli, Commands, RecordOptions},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use whistle::domain::config::AppConfig;
use whistle::domain::recording::Duration;
use whistle::infrastructure::XdgConfigStore;

/// Filter variable for diagnostics
const LOG_ENV: &str = "WHISTLE_LOG";

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("whistle=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let presenter = Presenter::new();

    // Config commands operate on the file alone
    if let Commands::Config { action } = cli.command {
        let store = XdgConfigStore::new();
        if let Err(e) = handle_config_command(action, &store, &presenter).await {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        return ExitCode::SUCCESS;
    }

    // Build CLI config from args
    let mut cli_config = AppConfig {
        publisher_url: cli.publisher_url.clone(),
        aggregator_url: cli.aggregator_url.clone(),
        ..Default::default()
    };
    if let Commands::Record(ref args) = cli.command {
        if let Some(ref raw) = args.max_duration {
            if let Err(e) = raw.parse::<Duration>() {
                presenter.error(&format!("Invalid max-duration: {}", e));
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
        }
        cli_config.max_duration = args.max_duration.clone();
        cli_config.epochs = args.epochs;
        cli_config.copy_link = args.copy.then_some(true);
    }

    // Merge config
    let config = load_merged_config(cli_config).await;

    // Route to appropriate handler
    match cli.command {
        Commands::Record(args) => {
            let options = RecordOptions {
                title: args.title,
                play: args.play,
                upload: !args.no_upload,
                copy_link: !args.no_upload && config.copy_link_or_default(),
                show_receipt: args.show_receipt,
            };
            run_record(options, &config).await
        }
        Commands::Play { target } => run_play(&target, &config).await,
        Commands::Fetch { target, output } => run_fetch(&target, output, &config).await,
        Commands::List => run_list(&config).await,
        Commands::Link { id } => run_link(&id, &config).await,
        Commands::Rename { id, title } => run_rename(&id, &title, &config).await,
        Commands::Delete { id } => run_delete(&id, &config).await,
        Commands::Config { .. } => ExitCode::SUCCESS,
    }
}
