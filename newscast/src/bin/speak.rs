use std::sync::Arc;

use anyhow::Context;
use common::Config;
use newscast::aggregator::Aggregator;
use newscast::ingestion::FeedFetcher;
use newscast::snapshot::SnapshotStore;
use newscast::tts::{build_backend, SpeechSynthesizer};

/// Usage: speak OUTPUT.mp3 [TEXT...]
///
/// Without TEXT, one aggregation cycle is run and its headline string is spoken.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let output = args.next().context("usage: speak OUTPUT.mp3 [TEXT...]")?;
    let text: Vec<String> = args.collect();

    let config = Config::load_with_defaults(
        Some(std::path::Path::new("config.default.toml")),
        Some(std::path::Path::new("config.toml")),
    )
    .await?;

    let text = if text.is_empty() {
        let store = SnapshotStore::loading(config.messages.loading.clone());
        let fetcher = FeedFetcher::from_config(&config.fetch)?;
        let aggregator = Aggregator::from_config(&config, Arc::new(fetcher), store.clone());
        aggregator.run_cycle().await?;
        store.read_current().text.clone()
    } else {
        text.join(" ")
    };

    let synthesizer = SpeechSynthesizer::from_config(&config.tts, build_backend(&config.tts)?);
    println!("Backend: {} (chunk budget {} bytes)", synthesizer.backend_name(), synthesizer.chunk_budget());
    println!("Text: {} bytes", text.len());

    let audio = synthesizer.synthesize(&text).await?;
    tokio::fs::write(&output, &audio)
        .await
        .with_context(|| format!("failed to write {}", output))?;
    println!("✓ Wrote {} bytes to {}", audio.len(), output);
    Ok(())
}
