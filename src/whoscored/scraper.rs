//! Per league/year scraping run.
//!
//! ```text
//!  Init ─▶ SeasonResolved ─▶ StagesResolved
//!       ─▶ CollectingLinks ─▶ FetchingMatches ─▶ Done
//!    └─ season not found: run fails, other leagues/years unaffected
//! ```

use std::fmt;
use tracing::{error, info, warn};

use super::fetcher::fetch_match;
use super::leagues::find_league;
use super::links::{collect_links, MatchLinkTable};
use super::navigator::{resolve_season_url, resolve_stage_urls};
use super::session::Session;
use super::ScrapeSettings;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    SeasonResolved,
    StagesResolved,
    CollectingLinks,
    FetchingMatches,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::SeasonResolved => "season resolved",
            RunState::StagesResolved => "stages resolved",
            RunState::CollectingLinks => "collecting links",
            RunState::FetchingMatches => "fetching matches",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Owns one browser session and drives scraping runs through it, strictly
/// sequentially.
pub struct WhoScored<S: Session> {
    session: S,
    settings: ScrapeSettings,
    state: RunState,
}

impl<S: Session> WhoScored<S> {
    pub fn new(session: S, settings: ScrapeSettings) -> Self {
        WhoScored {
            session,
            settings,
            state: RunState::Init,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        info!("Initializing WhoScored scraper");
        self.session.start().await
    }

    pub async fn close(&mut self) {
        info!("Closing WhoScored scraper");
        self.session.stop().await;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    fn advance(&mut self, next: RunState) {
        info!("Scrape state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Discover every match link of a league season, keyed to the sentinel.
    pub async fn get_match_links(&mut self, year: i32, league: &str) -> Result<MatchLinkTable> {
        info!("Getting match links for {} {}", league, year);
        self.state = RunState::Init;
        let league = find_league(league)?;

        let season_url =
            resolve_season_url(&mut self.session, league, year, &self.settings).await?;
        self.advance(RunState::SeasonResolved);

        let stages = resolve_stage_urls(&mut self.session, &season_url, &self.settings).await?;
        self.advance(RunState::StagesResolved);

        self.advance(RunState::CollectingLinks);
        let mut table = MatchLinkTable::new();
        for stage_url in &stages {
            info!("Processing stage: {}", stage_url);
            match collect_links(&mut self.session, stage_url, &self.settings).await {
                Ok(links) => table.extend_links(links),
                Err(e) => error!("Failed to collect links for stage {}: {}", stage_url, e),
            }
        }
        Ok(table)
    }

    /// Scrape every match of a league season.
    ///
    /// Only a failure before links are known is returned as an error; match
    /// failures leave their entry at the sentinel.
    pub async fn scrape_matches(&mut self, year: i32, league: &str) -> Result<MatchLinkTable> {
        info!("Starting to scrape matches for {} {}", league, year);
        let mut table = self.get_match_links(year, league).await?;
        info!("Total matches found for {} {}: {}", league, year, table.len());
        if table.is_empty() {
            warn!("No match links found for {} {}", league, year);
        }

        self.advance(RunState::FetchingMatches);
        let total = table.len();
        for (i, link) in table.pending().into_iter().enumerate() {
            info!("Scraping match {}/{}", i + 1, total);
            self.scrape_with_retry(&mut table, &link).await;
        }

        self.advance(RunState::Done);
        Ok(table)
    }

    /// Fetch one match, restarting the session between failed attempts.
    ///
    /// Returns whether the entry was filled. Never propagates an error.
    pub async fn scrape_with_retry(&mut self, table: &mut MatchLinkTable, link: &str) -> bool {
        let max_attempts = self.settings.match_attempts.max(1);
        for attempt in 1..=max_attempts {
            info!("Fetching {} (attempt {})", link, attempt);
            match fetch_match(&mut self.session, link).await {
                Ok(payload) => {
                    table.fill(link, payload);
                    return true;
                }
                Err(e) => {
                    error!("Error scraping match: {}", e);
                    if attempt == max_attempts {
                        error!("Failed to scrape match from {} after {} attempts", link, attempt);
                    } else {
                        if let Err(e) = self.session.restart().await {
                            warn!("Session restart failed: {}", e);
                        }
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }
        false
    }
}
