use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

mod cache;
mod config;
mod error;
mod pipeline;
mod processing;
mod whoscored;

use cache::GameCache;
use config::Config;
use processing::ClubDirectory;
use whoscored::{ChromeSession, WhoScored};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    config.validate()?;

    let clubs = match &config.clubs_file {
        Some(path) => {
            let clubs = ClubDirectory::load(path)?;
            info!("Loaded {} clubs from {:?}", clubs.clubs.len(), path);
            clubs
        }
        None => ClubDirectory::default(),
    };

    if let Some(dir) = &config.debug_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create debug dir {:?}", dir))?;
    }

    let leagues = config.league_names();
    info!(
        "Scraping {} league(s) for {}: {}",
        leagues.len(),
        config.year,
        leagues.join(", ")
    );

    let session = ChromeSession::new(config.chrome_options());
    let mut scraper = WhoScored::new(session, config.scrape_settings());
    let cache = GameCache::new();

    let summary = pipeline::run(&mut scraper, &leagues, config.year, &clubs, &cache).await?;
    info!(
        "Cached {} match(es) in {} key(s)",
        summary.matches_stored,
        cache.len().await
    );
    debug!("Cache keys: {:?}", cache.keys().await);

    if let Some(path) = &config.dump_path {
        pipeline::dump_cache(&cache, path).await?;
    }

    Ok(())
}
