//! Scripted in-memory [`Session`] used by the unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use super::session::{ElementSnapshot, Locator, Session};
use crate::error::{Result, ScrapeError};

/// One page of canned DOM state.
///
/// `frames` models a client-side calendar: clicking `advance_on` moves to
/// the next frame (saturating at the last one).
#[derive(Default, Clone)]
pub struct FakePage {
    pub frames: Vec<HashMap<Locator, Vec<ElementSnapshot>>>,
    pub advance_on: Option<Locator>,
    pub scripts: Vec<String>,
    pub position: usize,
}

impl FakePage {
    pub fn single(elements: Vec<(Locator, Vec<ElementSnapshot>)>) -> Self {
        FakePage {
            frames: vec![elements.into_iter().collect()],
            ..FakePage::default()
        }
    }

    pub fn with_scripts(scripts: Vec<&str>) -> Self {
        FakePage {
            frames: vec![HashMap::new()],
            scripts: scripts.into_iter().map(String::from).collect(),
            ..FakePage::default()
        }
    }
}

#[derive(Default)]
pub struct FakeSession {
    pub pages: HashMap<String, FakePage>,
    pub current: Option<String>,
    pub running: bool,
    pub starts: usize,
    pub stops: usize,
    /// Number of upcoming `navigate` calls that fail.
    pub failing_navigations: usize,
    pub visited: Vec<String>,
    pub clicks: Vec<Locator>,
    pub queries: Vec<Locator>,
    /// Fail the n-th (1-based) query of this locator.
    pub failing_query: Option<(Locator, usize)>,
}

impl FakeSession {
    pub fn new() -> Self {
        FakeSession {
            running: true,
            ..FakeSession::default()
        }
    }

    pub fn with_page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn restarts(&self) -> usize {
        self.stops
    }

    fn current_page(&mut self) -> Result<&mut FakePage> {
        let url = self.current.clone().ok_or(ScrapeError::SessionClosed)?;
        self.pages
            .get_mut(&url)
            .ok_or_else(|| ScrapeError::Browser(format!("no fake page for {}", url)))
    }
}

pub fn element(text: &str, attributes: &[(&str, &str)]) -> ElementSnapshot {
    ElementSnapshot {
        text: text.to_string(),
        displayed: true,
        enabled: true,
        attributes: attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

pub fn disabled(mut snapshot: ElementSnapshot) -> ElementSnapshot {
    snapshot.enabled = false;
    snapshot
}

#[async_trait]
impl Session for FakeSession {
    async fn start(&mut self) -> Result<()> {
        self.starts += 1;
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) {
        self.stops += 1;
        self.running = false;
        self.current = None;
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        if !self.running {
            return Err(ScrapeError::SessionClosed);
        }
        self.visited.push(url.to_string());
        if self.failing_navigations > 0 {
            self.failing_navigations -= 1;
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        if let Some(page) = self.pages.get_mut(url) {
            page.position = 0;
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn ready_state(&mut self) -> Result<String> {
        Ok("complete".to_string())
    }

    async fn current_url(&mut self) -> Result<String> {
        self.current.clone().ok_or(ScrapeError::SessionClosed)
    }

    async fn query(
        &mut self,
        locator: &Locator,
        _attributes: &[&str],
    ) -> Result<Vec<ElementSnapshot>> {
        self.queries.push(locator.clone());
        if let Some((failing, nth)) = &self.failing_query {
            let seen = self.queries.iter().filter(|q| *q == failing).count();
            if failing == locator && seen == *nth {
                return Err(ScrapeError::Browser("stale element".to_string()));
            }
        }
        let page = self.current_page()?;
        Ok(page
            .frames
            .get(page.position)
            .and_then(|frame| frame.get(locator))
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&mut self, locator: &Locator) -> Result<()> {
        self.clicks.push(locator.clone());
        let page = self.current_page()?;
        if page.advance_on.as_ref() == Some(locator) && page.position + 1 < page.frames.len() {
            page.position += 1;
        }
        Ok(())
    }

    async fn execute(&mut self, _script: &str) -> Result<serde_json::Value> {
        let page = self.current_page()?;
        Ok(serde_json::to_value(&page.scripts)?)
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok("<html></html>".to_string())
    }

    async fn screenshot(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
