//! Resolve a (league, year) pair to its season page and fixture stages.

use tracing::{info, warn};

use super::consent;
use super::leagues::League;
use super::session::{Locator, Session};
use super::ScrapeSettings;
use crate::error::{Result, ScrapeError};

const SEASON_OPTIONS: &str = "select#seasons option";
const STAGE_OPTIONS: &str = "#stages option";

/// Find the season URL for `year` in the league's season dropdown.
///
/// Loading the league index page is retried with a full session restart
/// after every failure, forever unless `season_nav_max_attempts` is set.
pub async fn resolve_season_url<S: Session + ?Sized>(
    session: &mut S,
    league: &League,
    year: i32,
    settings: &ScrapeSettings,
) -> Result<String> {
    let label = league.season_label(year);
    let index_url = league.index_url(&settings.base_url);

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match session.navigate(&index_url).await {
            Ok(()) => break,
            Err(e) => {
                warn!(
                    "League page {} failed to load (attempt {}): {}",
                    index_url, attempts, e
                );
                if settings
                    .season_nav_max_attempts
                    .is_some_and(|max| attempts >= max)
                {
                    return Err(e);
                }
                if let Err(e) = session.restart().await {
                    warn!("Session restart failed: {}", e);
                }
                tokio::time::sleep(settings.season_retry_delay).await;
            }
        }
    }

    match session.ready_state().await {
        Ok(state) => info!("League page status: {}", state),
        Err(e) => warn!("Could not read league page status: {}", e),
    }

    let options = session
        .query(&Locator::css(SEASON_OPTIONS), &["value"])
        .await?;
    options
        .iter()
        .find(|option| option.text.trim() == label)
        .and_then(|option| option.attr("value"))
        .map(|value| settings.absolute(value))
        .ok_or_else(|| ScrapeError::SeasonNotFound {
            league: league.name.to_string(),
            label,
        })
}

/// Stage URLs of a season, in dropdown order and without duplicates.
/// A season without a stage selector is its own single stage.
pub async fn resolve_stage_urls<S: Session + ?Sized>(
    session: &mut S,
    season_url: &str,
    settings: &ScrapeSettings,
) -> Result<Vec<String>> {
    session.navigate(season_url).await?;
    match session.ready_state().await {
        Ok(state) => info!("Season page status: {}", state),
        Err(e) => warn!("Could not read season page status: {}", e),
    }

    if !consent::dismiss(session, &settings.consent, settings.debug_dir.as_deref()).await {
        warn!("Failed to handle cookie consent, continuing anyway...");
    }

    let mut stages: Vec<String> = Vec::new();
    for option in session
        .query(&Locator::css(STAGE_OPTIONS), &["value"])
        .await?
    {
        if let Some(value) = option.attr("value") {
            let url = settings.absolute(value);
            if !stages.contains(&url) {
                stages.push(url);
            }
        }
    }

    if stages.is_empty() {
        let fallback = session
            .current_url()
            .await
            .unwrap_or_else(|_| season_url.to_string());
        stages.push(fallback);
    }

    info!("Number of stages found: {}", stages.len());
    Ok(stages)
}
