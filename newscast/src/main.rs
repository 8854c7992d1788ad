/*
newscast - single-binary main.rs
This binary starts the Rocket HTTP server and runs the news refresh worker inside the same process.
*/

use anyhow::Result;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newscast::aggregator::Aggregator;
use newscast::ingestion::FeedFetcher;
use newscast::server::{self, AppState};
use newscast::snapshot::SnapshotStore;
use newscast::tts::{self, SpeechSynthesizer};

#[derive(Parser, Debug)]
#[command(name = "newscast", about = "Headline aggregator serving news text and speech")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable the refresh worker (serve the loading placeholder only)
    #[arg(long)]
    no_worker: bool,

    /// Run a single aggregation cycle, print the result and exit
    #[arg(long)]
    once: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let mut config = load_config(args.config).await?;
    if let Ok(port) = std::env::var("PORT") {
        match port.parse::<u16>() {
            Ok(p) => config.server.port = p,
            Err(e) => warn!(%port, %e, "ignoring invalid PORT environment variable"),
        }
    }
    config.validate()?;

    let snapshots = SnapshotStore::loading(config.messages.loading.clone());
    let fetcher = FeedFetcher::from_config(&config.fetch)?;
    let aggregator = Aggregator::from_config(&config, Arc::new(fetcher), snapshots.clone());

    if args.once {
        if let Err(e) = aggregator.run_cycle().await {
            error!(%e, "aggregation cycle failed");
        }
        println!("{}", snapshots.read_current().text);
        return Ok(());
    }

    if config.feeds.urls.is_empty() {
        warn!("no feeds configured; /news will only show placeholders");
    }

    let synthesizer = match tts::build_backend(&config.tts) {
        Ok(backend) => {
            let synthesizer = SpeechSynthesizer::from_config(&config.tts, backend);
            info!(
                backend = synthesizer.backend_name(),
                chunk_budget = synthesizer.chunk_budget(),
                "TTS backend initialized"
            );
            Some(synthesizer)
        }
        Err(e) => {
            error!("Failed to initialize TTS backend: {:#}", e);
            None
        }
    };

    let worker = if args.no_worker {
        info!("Refresh worker disabled via CLI (--no-worker)");
        None
    } else {
        info!("Spawning news refresh worker");
        Some(aggregator.spawn(config.scheduler.interval()))
    };

    let state = AppState::new(&config, snapshots, synthesizer);
    let rocket = server::build_rocket(&config, state);

    info!(bind = %config.server.bind, port = config.server.port, "Launching Rocket HTTP server");
    if let Err(e) = server::launch_rocket(rocket).await {
        error!(%e, "Rocket server failed");
    }

    if let Some(handle) = worker {
        info!("HTTP server stopped; notifying worker to shutdown");
        handle.shutdown();
        match tokio::time::timeout(Duration::from_secs(20), handle.join()).await {
            Ok(Ok(())) => info!("worker exited cleanly"),
            Ok(Err(join_err)) => error!(%join_err, "worker task panicked"),
            Err(_) => info!("Timed out waiting for worker to exit; continuing shutdown"),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolve `config.default.toml` plus an optional override (`--config` or `./config.toml`).
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default_file = ?default_path, override_file = ?override_path, "configuration loaded");
    Ok(config)
}
