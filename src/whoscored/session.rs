//! Browser session ownership.
//!
//! A [`Session`] is the only shared mutable resource of a scraping run. It is
//! owned exclusively by one orchestrator and is mutated through `&mut self`
//! only, so no pooling or partial sharing is possible. Recovery from any
//! failure is a full [`Session::restart`].

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, ScrapeError};

/// Interval between presence checks in [`Session::wait_for`].
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/83.0.4103.53 Safari/537.36";

/// Hides `navigator.webdriver` before any page script runs.
const STEALTH_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

/// How an element is located in the DOM.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Plain-data view of a DOM element at query time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElementSnapshot {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub displayed: bool,
    #[serde(default)]
    pub enabled: bool,
    /// Only the attributes requested in the query, and only when present.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_clickable(&self) -> bool {
        self.displayed && self.enabled
    }
}

/// The browser capability surface the scraper drives.
///
/// `stop` must be safe to call on a session that never started or that
/// failed half-way through `start`.
#[async_trait]
pub trait Session: Send {
    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self);

    /// Tear the session down and build a fresh one.
    async fn restart(&mut self) -> Result<()> {
        self.stop().await;
        self.start().await
    }

    /// Load `url` and return once the document ready-state is queryable.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn ready_state(&mut self) -> Result<String>;

    async fn current_url(&mut self) -> Result<String>;

    /// Snapshot every element matching `locator`, reading `attributes`.
    async fn query(
        &mut self,
        locator: &Locator,
        attributes: &[&str],
    ) -> Result<Vec<ElementSnapshot>>;

    /// Script-click the first element matching `locator`.
    async fn click(&mut self, locator: &Locator) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn execute(&mut self, script: &str) -> Result<serde_json::Value>;

    async fn page_source(&mut self) -> Result<String>;

    async fn screenshot(&mut self, path: &Path) -> Result<()>;

    /// Poll until at least one element matches, or fail after `timeout`.
    async fn wait_for(
        &mut self,
        locator: &Locator,
        attributes: &[&str],
        timeout: Duration,
    ) -> Result<Vec<ElementSnapshot>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let found = self.query(locator, attributes).await?;
            if !found.is_empty() {
                return Ok(found);
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(ScrapeError::ElementNotFound(locator.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Poll until the first matching element is displayed and enabled.
    async fn wait_for_clickable(
        &mut self,
        locator: &Locator,
        attributes: &[&str],
        timeout: Duration,
    ) -> Result<ElementSnapshot> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(first) = self.query(locator, attributes).await?.into_iter().next() {
                if first.is_clickable() {
                    return Ok(first);
                }
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(ScrapeError::ElementNotFound(locator.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

/// Launch settings for [`ChromeSession`].
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: String,
    pub window: (u32, u32),
    pub page_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        ChromeOptions {
            executable: None,
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window: (1920, 1080),
            page_timeout: Duration::from_secs(30),
        }
    }
}

/// Chromium driven over CDP.
pub struct ChromeSession {
    options: ChromeOptions,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

impl ChromeSession {
    pub fn new(options: ChromeOptions) -> Self {
        ChromeSession {
            options,
            browser: None,
            page: None,
            handler: None,
        }
    }

    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or(ScrapeError::SessionClosed)
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let (width, height) = self.options.window;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .request_timeout(self.options.page_timeout)
            .args([
                "--disable-dev-shm-usage",
                "--disable-blink-features=AutomationControlled",
                "--blink-settings=imagesEnabled=false",
            ]);
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(ScrapeError::Browser)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page()?
            .evaluate_expression(EvaluateParams::new(script))
            .await?;
        Ok(result.into_value::<serde_json::Value>()?)
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn start(&mut self) -> Result<()> {
        if self.browser.is_some() {
            self.stop().await;
        }

        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config).await?;
        self.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        }));
        self.browser = Some(browser);

        let page = match &self.browser {
            Some(browser) => browser.new_page("about:blank").await?,
            None => return Err(ScrapeError::SessionClosed),
        };
        page.set_user_agent(self.options.user_agent.as_str()).await?;
        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
            STEALTH_SCRIPT,
        ))
        .await?;
        self.page = Some(page);

        info!("Browser session started");
        Ok(())
    }

    async fn stop(&mut self) {
        self.page = None;
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser cleanly: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to reap browser process: {}", e);
            }
            info!("Browser session stopped");
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self.page()?;
        match tokio::time::timeout(self.options.page_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    reason: format!("timed out after {:?}", self.options.page_timeout),
                })
            }
        }
        self.ready_state().await.map(|_| ())
    }

    async fn ready_state(&mut self) -> Result<String> {
        let state = self.evaluate("document.readyState").await?;
        Ok(state.as_str().unwrap_or_default().to_string())
    }

    async fn current_url(&mut self) -> Result<String> {
        self.page()?
            .url()
            .await?
            .ok_or_else(|| ScrapeError::Browser("page has no URL".to_string()))
    }

    async fn query(
        &mut self,
        locator: &Locator,
        attributes: &[&str],
    ) -> Result<Vec<ElementSnapshot>> {
        let value = self.evaluate(&query_script(locator, attributes)?).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn click(&mut self, locator: &Locator) -> Result<()> {
        let script = format!(
            "(function() {{ const el = {}[0]; if (!el) return false; el.click(); return true; }})()",
            nodes_expression(locator)?
        );
        match self.evaluate(&script).await? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(ScrapeError::ElementNotFound(locator.to_string())),
        }
    }

    async fn execute(&mut self, script: &str) -> Result<serde_json::Value> {
        self.evaluate(script).await
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.page()?.content().await?)
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        self.page()?
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// JS expression evaluating to an array of the nodes `locator` matches.
fn nodes_expression(locator: &Locator) -> Result<String> {
    Ok(match locator {
        Locator::Css(selector) => format!(
            "Array.from(document.querySelectorAll({}))",
            serde_json::to_string(selector)?
        ),
        Locator::XPath(expression) => format!(
            "(function(x) {{ const r = document.evaluate(x, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
             return out; }})({})",
            serde_json::to_string(expression)?
        ),
    })
}

fn query_script(locator: &Locator, attributes: &[&str]) -> Result<String> {
    Ok(format!(
        "(function(nodes, names) {{ return nodes.map(el => ({{ \
         text: (el.innerText || el.textContent || '').trim(), \
         displayed: el.getClientRects().length > 0, \
         enabled: !el.disabled, \
         attributes: Object.fromEntries(names \
           .filter(n => el.getAttribute(n) !== null) \
           .map(n => [n, el.getAttribute(n)])) }})); }})({}, {})",
        nodes_expression(locator)?,
        serde_json::to_string(attributes)?
    ))
}
