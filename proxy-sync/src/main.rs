//! proxy-sync: keep destination proxy hosts in line with a source server

use clap::Parser;
use proxy_sync::config::{DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILE};
use proxy_sync::{logging, scheduler, HttpApi, SyncConfig, SyncError, SyncRunner};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "proxy-sync")]
#[command(about = "Mirror proxy hosts from a source server to destination servers", long_about = None)]
struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Append-only log file (overrides `log_file` from the configuration)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = SyncConfig::from_file(&cli.config);

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| {
            config
                .as_ref()
                .ok()
                .and_then(|c| c.log_file.as_ref().map(PathBuf::from))
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    logging::init(Some(&log_file));

    info!("Starting proxy-sync v{}", env!("CARGO_PKG_VERSION"));

    let config = match config.and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(SyncError::ConfigNotFound(path)) => {
            error!(
                "Error: Configuration file not found. Please make sure {} exists and is readable",
                path
            );
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: SyncConfig) -> anyhow::Result<()> {
    info!(
        "Syncing {} to {} destination(s)",
        config.source.address,
        config.destinations.len()
    );

    let api = Arc::new(HttpApi::new(config.request_timeout())?);
    let runner = SyncRunner::from_config(api, &config);

    if cli.once {
        if scheduler::run_once(&runner).await?.is_none() {
            anyhow::bail!("sync cycle aborted");
        }
        return Ok(());
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    scheduler::run_forever(&runner, config.effective_interval(), shutdown).await?;
    Ok(())
}
