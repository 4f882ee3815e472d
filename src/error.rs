use thiserror::Error;

/// Failure kinds surfaced by the scraping core.
///
/// Callers match on the kind to decide whether to retry (navigation,
/// browser, payload), fall back (missing stage selector) or give up on a
/// league/year (season not found).
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("browser error: {0}")]
    Browser(String),
    #[error("session is not running")]
    SessionClosed,
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("unknown league: {0}")]
    UnknownLeague(String),
    #[error("season {label} not found for {league}")]
    SeasonNotFound { league: String, label: String },
    #[error("no match payload script on {0}")]
    ScriptNotFound(String),
    #[error("malformed match payload: {0}")]
    Payload(String),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
