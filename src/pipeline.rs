//! Batch run: scrape every configured league for one season, turn the
//! payloads into enriched event rows and store them in the cache.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info, warn};

use crate::cache::{game_key, GameCache, GAMES_KEY};
use crate::processing::{preprocess_events, process_match_data, ClubDirectory, GameInfo};
use crate::whoscored::{MatchLinkTable, Session, WhoScored};

/// Per-run counters, logged at the end of the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub leagues_ok: usize,
    pub leagues_failed: usize,
    pub matches_found: usize,
    pub matches_stored: usize,
}

/// Run the batch over `leagues`. A league that fails is logged and skipped.
/// The browser session is stopped before returning, whatever happened.
pub async fn run<S: Session>(
    scraper: &mut WhoScored<S>,
    leagues: &[String],
    year: i32,
    clubs: &ClubDirectory,
    cache: &GameCache,
) -> Result<RunSummary> {
    let result = run_leagues(scraper, leagues, year, clubs, cache).await;
    scraper.close().await;
    result
}

async fn run_leagues<S: Session>(
    scraper: &mut WhoScored<S>,
    leagues: &[String],
    year: i32,
    clubs: &ClubDirectory,
    cache: &GameCache,
) -> Result<RunSummary> {
    scraper.start().await.context("Failed to start browser session")?;

    let mut summary = RunSummary::default();
    let mut games: Vec<GameInfo> = Vec::new();

    for league in leagues {
        info!("Processing {} for {}", league, year);
        let table = match scraper.scrape_matches(year, league).await {
            Ok(table) => table,
            Err(e) => {
                error!("Error processing {} {}: {}", league, year, e);
                summary.leagues_failed += 1;
                continue;
            }
        };
        info!("{} {} finished in state: {}", league, year, scraper.state());
        summary.leagues_ok += 1;
        summary.matches_found += table.len();

        for info in store_league(&table, league, year, clubs, cache).await? {
            summary.matches_stored += 1;
            games.push(info);
        }
    }

    cache
        .set(GAMES_KEY, &games)
        .await
        .context("Failed to store games summary")?;
    if let Some(at) = cache.stored_at(GAMES_KEY).await {
        info!("Games summary stored at {}", at);
    }
    info!(
        "Batch done: {} leagues ok, {} failed, {}/{} matches stored",
        summary.leagues_ok,
        summary.leagues_failed,
        summary.matches_stored,
        summary.matches_found
    );
    Ok(summary)
}

/// Write the cache to `path`. An empty cache is not written; returns
/// whether the file was produced.
pub async fn dump_cache(cache: &GameCache, path: &Path) -> Result<bool> {
    if cache.is_empty().await {
        warn!("Cache is empty, nothing written to {:?}", path);
        return Ok(false);
    }
    cache
        .dump(path)
        .await
        .with_context(|| format!("Failed to dump cache to {:?}", path))?;
    info!("Cache written to {:?}", path);
    Ok(true)
}

/// Process and cache every fetched match of one league; returns the summary
/// rows of the matches that were stored.
async fn store_league(
    table: &MatchLinkTable,
    league: &str,
    year: i32,
    clubs: &ClubDirectory,
    cache: &GameCache,
) -> Result<Vec<GameInfo>> {
    let mut stored = Vec::new();
    for (link, payload) in table.fetched() {
        let mut matched = match process_match_data(link, payload, league, year) {
            Ok(m) => m,
            Err(e) => {
                error!("Error processing match data for {}: {}", link, e);
                continue;
            }
        };
        preprocess_events(&mut matched, clubs);

        let key = game_key(matched.info.game_id);
        cache
            .set(&key, &matched.events)
            .await
            .with_context(|| format!("Failed to store {}", key))?;
        info!("Stored {} events under {}", matched.events.len(), key);
        stored.push(matched.info);
    }
    Ok(stored)
}
