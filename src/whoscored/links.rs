//! Match link discovery over the paginated fixture calendar.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{error, info, warn};
use url::Url;

use super::session::{Locator, Session};
use super::ScrapeSettings;
use crate::error::Result;

const DATE_PICKER_TOGGLE: &str = ".toggleDatePicker";
const MATCH_SCORE_ANCHOR: &str = "a[class*='Match-module_score']";
const PREVIOUS_PERIOD: &str = "#dayChangeBtn-prev";

/// Map a preview ("Show") fixture link onto its live/result link.
///
/// Idempotent: a link without "Show" is returned unchanged.
pub fn normalize_link(link: &str) -> String {
    if link.contains("Show") {
        link.replace("Show", "Live")
    } else {
        link.to_string()
    }
}

/// Resolve an anchor `href` against the site base, then normalize it.
pub fn resolve_link(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let absolute = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(base_url).ok()?.join(href).ok()?
        }
        Err(_) => return None,
    };
    Some(normalize_link(absolute.as_str()))
}

/// Parsed payload embedded in a match page. Opaque to the scraper.
pub type MatchPayload = serde_json::Value;

/// Match link → payload; `None` is the sentinel for "not fetched yet" or
/// "failed for good". Keys are only ever added.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MatchLinkTable {
    entries: BTreeMap<String, Option<MatchPayload>>,
}

impl MatchLinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sentinel entry for each new link; existing entries are kept.
    pub fn extend_links<I: IntoIterator<Item = String>>(&mut self, links: I) {
        for link in links {
            self.entries.entry(normalize_link(&link)).or_insert(None);
        }
    }

    pub fn fill(&mut self, link: &str, payload: MatchPayload) {
        self.entries.insert(link.to_string(), Some(payload));
    }

    #[cfg(test)]
    pub fn get(&self, link: &str) -> Option<&Option<MatchPayload>> {
        self.entries.get(link)
    }

    /// Links still at the sentinel.
    pub fn pending(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn fetched(&self) -> impl Iterator<Item = (&String, &MatchPayload)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|payload| (k, payload)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walk a stage's fixture calendar backwards and gather every match link.
///
/// Stops on the first of: attempt bound reached, date label stalled, a
/// non-first page without match anchors, previous-period control disabled
/// or missing.
pub async fn collect_links<S: Session + ?Sized>(
    session: &mut S,
    stage_url: &str,
    settings: &ScrapeSettings,
) -> Result<BTreeSet<String>> {
    session.navigate(stage_url).await?;
    match session.ready_state().await {
        Ok(state) => info!("{} status: {}", stage_url, state),
        Err(e) => warn!("Could not read ready state of {}: {}", stage_url, e),
    }

    let date_toggle = Locator::css(DATE_PICKER_TOGGLE);
    let anchors = Locator::css(MATCH_SCORE_ANCHOR);
    let previous = Locator::css(PREVIOUS_PERIOD);

    let mut links = BTreeSet::new();
    let mut current_label: Option<String> = None;
    let mut attempts = 0;

    while attempts < settings.max_pages {
        attempts += 1;
        tokio::time::sleep(settings.render_delay).await;
        info!("--- Attempt {} ---", attempts);

        match session
            .wait_for(&date_toggle, &[], settings.element_timeout)
            .await
        {
            Ok(found) => {
                let label = found.into_iter().next().map(|el| el.text).unwrap_or_default();
                if current_label.as_deref() != Some(label.as_str()) {
                    info!("Date changed: {}", label);
                    current_label = Some(label);
                } else {
                    info!("Date didn't change, page might not have updated");
                    if attempts > 1 {
                        break;
                    }
                }
            }
            Err(e) => warn!("Error getting date: {}", e),
        }

        let candidates: BTreeSet<String> = match session.query(&anchors, &["href"]).await {
            Ok(found) => found
                .iter()
                .filter_map(|el| el.attr("href"))
                .filter_map(|href| resolve_link(&settings.base_url, href))
                .collect(),
            Err(e) => {
                error!("Error reading match links: {}", e);
                break;
            }
        };
        let found = candidates.len();
        links.extend(candidates);
        info!("New links found: {}", found);
        info!("Total unique links: {}", links.len());

        if found == 0 && attempts > 1 {
            info!("No new links found. Stopping.");
            break;
        }

        match session
            .wait_for(&previous, &[], settings.element_timeout)
            .await
        {
            Ok(found) => {
                if !found.first().is_some_and(|el| el.enabled) {
                    info!("Previous week button is disabled. Stopping.");
                    break;
                }
                info!("Clicking previous week button...");
                if let Err(e) = session.click(&previous).await {
                    error!("Error with previous week button: {}", e);
                    break;
                }
                tokio::time::sleep(settings.page_turn_delay).await;
            }
            Err(e) => {
                error!("Error with previous week button: {}", e);
                break;
            }
        }
    }

    Ok(links)
}
