pub mod consent;
pub mod fetcher;
pub mod leagues;
pub mod links;
pub mod navigator;
pub mod scraper;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use leagues::find_league;
pub use links::MatchLinkTable;
pub use scraper::WhoScored;
pub use session::{ChromeOptions, ChromeSession, Session};

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.whoscored.com";

/// Bounds and pacing for one scraping run.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub base_url: String,
    /// Link Collector attempts per stage.
    pub max_pages: u32,
    /// Retry Orchestrator attempts per match link.
    pub match_attempts: u32,
    /// Cap on league index navigation retries; `None` retries forever.
    pub season_nav_max_attempts: Option<u32>,
    /// Pause before reading the calendar on every collector attempt.
    pub render_delay: Duration,
    /// Pause after clicking "previous period".
    pub page_turn_delay: Duration,
    /// Wait for the date picker label and the previous-period control.
    pub element_timeout: Duration,
    pub retry_delay: Duration,
    pub season_retry_delay: Duration,
    pub consent: ConsentTimings,
    /// Where consent failures dump a screenshot and the page HTML.
    pub debug_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ConsentTimings {
    pub body_timeout: Duration,
    pub agree_timeout: Duration,
    pub close_timeout: Duration,
    pub after_agree: Duration,
    pub after_close: Duration,
}

impl Default for ConsentTimings {
    fn default() -> Self {
        ConsentTimings {
            body_timeout: Duration::from_secs(20),
            agree_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(5),
            after_agree: Duration::from_secs(5),
            after_close: Duration::from_secs(2),
        }
    }
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        ScrapeSettings {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_pages: 10,
            match_attempts: 3,
            season_nav_max_attempts: None,
            render_delay: Duration::from_secs(2),
            page_turn_delay: Duration::from_secs(3),
            element_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(2),
            season_retry_delay: Duration::from_secs(5),
            consent: ConsentTimings::default(),
            debug_dir: None,
        }
    }
}

impl ScrapeSettings {
    /// Same bounds, no waiting. Used by tests against scripted sessions.
    #[cfg(test)]
    pub fn instant() -> Self {
        ScrapeSettings {
            render_delay: Duration::ZERO,
            page_turn_delay: Duration::ZERO,
            element_timeout: Duration::ZERO,
            retry_delay: Duration::ZERO,
            season_retry_delay: Duration::ZERO,
            consent: ConsentTimings {
                body_timeout: Duration::ZERO,
                agree_timeout: Duration::ZERO,
                close_timeout: Duration::ZERO,
                after_agree: Duration::ZERO,
                after_close: Duration::ZERO,
            },
            ..ScrapeSettings::default()
        }
    }

    /// Prefix a site-relative path (as found in option values) with the base URL.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
