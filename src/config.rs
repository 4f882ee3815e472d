use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::whoscored::{find_league, ChromeOptions, ScrapeSettings, DEFAULT_BASE_URL};

/// Batch scraper for WhoScored match event data
#[derive(Parser, Debug, Clone)]
#[command(name = "whoscored-batch", version, about)]
pub struct Config {
    /// Comma separated league names from the catalog
    #[arg(
        long,
        env = "LEAGUES",
        value_delimiter = ',',
        default_value = "Bundesliga,EPL,La Liga,Ligue 1,Serie A"
    )]
    pub leagues: Vec<String>,

    /// Season year (a split season is named by the year it ends in)
    #[arg(long, env = "SEASON_YEAR", default_value = "2025")]
    pub year: i32,

    /// Site root
    #[arg(long, env = "WHOSCORED_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Chromium executable (auto-detected when unset)
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Show a browser window instead of running headless
    #[arg(long, env = "HEADED", default_value = "false")]
    pub headed: bool,

    /// Attempts per match page, with a session restart between attempts
    #[arg(long, env = "MATCH_ATTEMPTS", default_value = "3")]
    pub match_attempts: u32,

    /// Cap on league page load attempts (unbounded when unset)
    #[arg(long, env = "SEASON_NAV_MAX_ATTEMPTS")]
    pub season_nav_max_attempts: Option<u32>,

    /// Calendar periods visited per stage
    #[arg(long, env = "MAX_PAGES", default_value = "10")]
    pub max_pages: u32,

    /// Page load timeout in seconds
    #[arg(long, env = "PAGE_TIMEOUT_SECS", default_value = "30")]
    pub page_timeout_secs: u64,

    /// JSON club directory used to name teams
    #[arg(long, env = "CLUBS_FILE")]
    pub clubs_file: Option<PathBuf>,

    /// Write the cache contents to this JSON file after the run
    #[arg(long, env = "DUMP_PATH")]
    pub dump_path: Option<PathBuf>,

    /// Directory for screenshots and HTML saved when consent handling fails
    #[arg(long, env = "DEBUG_DIR")]
    pub debug_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let leagues = self.league_names();
        if leagues.is_empty() {
            anyhow::bail!("at least one league is required");
        }
        for league in &leagues {
            find_league(league)?;
        }
        if self.year < 2009 {
            anyhow::bail!("year must be 2009 or later");
        }
        if self.match_attempts == 0 {
            anyhow::bail!("match_attempts must be at least 1");
        }
        if self.max_pages == 0 {
            anyhow::bail!("max_pages must be at least 1");
        }
        if self.season_nav_max_attempts == Some(0) {
            anyhow::bail!("season_nav_max_attempts must be at least 1 when set");
        }
        if self.page_timeout_secs == 0 {
            anyhow::bail!("page_timeout_secs must be positive");
        }
        Ok(())
    }

    /// League names with surrounding whitespace and empty entries removed.
    pub fn league_names(&self) -> Vec<String> {
        self.leagues
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            base_url: self.base_url.clone(),
            max_pages: self.max_pages,
            match_attempts: self.match_attempts,
            season_nav_max_attempts: self.season_nav_max_attempts,
            debug_dir: self.debug_dir.clone(),
            ..ScrapeSettings::default()
        }
    }

    pub fn chrome_options(&self) -> ChromeOptions {
        ChromeOptions {
            executable: self.chrome_path.clone(),
            headless: !self.headed,
            page_timeout: Duration::from_secs(self.page_timeout_secs),
            ..ChromeOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["whoscored-batch"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        config.validate().unwrap();
        assert_eq!(
            config.league_names(),
            vec!["Bundesliga", "EPL", "La Liga", "Ligue 1", "Serie A"]
        );
        assert_eq!(config.year, 2025);
        let settings = config.scrape_settings();
        assert_eq!(settings.match_attempts, 3);
        assert_eq!(settings.max_pages, 10);
        assert_eq!(settings.season_nav_max_attempts, None);
        assert!(config.chrome_options().headless);
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--leagues",
            "MLS, Eredivisie",
            "--year",
            "2024",
            "--headed",
            "--season-nav-max-attempts",
            "4",
            "--page-timeout-secs",
            "10",
        ]);
        config.validate().unwrap();
        assert_eq!(config.league_names(), vec!["MLS", "Eredivisie"]);
        assert_eq!(config.scrape_settings().season_nav_max_attempts, Some(4));
        let chrome = config.chrome_options();
        assert!(!chrome.headless);
        assert_eq!(chrome.page_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(parse(&["--leagues", "Sunday League"]).validate().is_err());
        assert!(parse(&["--year", "2001"]).validate().is_err());
        assert!(parse(&["--match-attempts", "0"]).validate().is_err());
        assert!(parse(&["--max-pages", "0"]).validate().is_err());
        assert!(parse(&["--season-nav-max-attempts", "0"]).validate().is_err());
    }
}
