use common::Config;
use newscast::ingestion::FeedFetcher;

/// Fetch feeds given on the command line (or `feeds.urls` from
/// config.default.toml / config.toml) and print what each one yields.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::load_with_defaults(
        Some(std::path::Path::new("config.default.toml")),
        Some(std::path::Path::new("config.toml")),
    )
    .await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let feeds = if args.is_empty() { config.feeds.urls.clone() } else { args };

    let fetcher = FeedFetcher::from_config(&config.fetch)?;

    for url in feeds {
        println!("\n{}", "=".repeat(60));
        println!("Feed: {}", url);
        println!("{}", "=".repeat(60));

        match fetcher.try_fetch(&url).await {
            Ok(items) => {
                println!("✓ {} headlines", items.len());
                for (i, item) in items.iter().take(5).enumerate() {
                    println!("    {}. {}", i + 1, item.title);
                    println!("       URL: {}", item.link.as_deref().unwrap_or("none"));
                }
            }
            Err(e) => {
                println!("✗ Failed: {}", e);
            }
        }
    }

    Ok(())
}
