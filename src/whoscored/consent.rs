//! Best-effort dismissal of the cookie/GDPR overlay.

use tracing::{info, warn};

use super::session::{Locator, Session};
use super::ConsentTimings;
use std::path::Path;

const AGREE_BUTTON: &str = "//div[contains(@class, 'qc-cmp2-footer')]//button[contains(@class, 'css-1wc0q5e')]/span[text()='AGREE']/parent::button";
const CLOSE_BUTTON: &str = "//button[@aria-label='Close']";
const CAPTCHA: &str = "#captcha-container";

/// Try to clear the consent overlay. Never fails: the overlay is not always
/// shown, so callers carry on either way and only log the outcome.
pub async fn dismiss<S: Session + ?Sized>(
    session: &mut S,
    timings: &ConsentTimings,
    debug_dir: Option<&Path>,
) -> bool {
    if let Err(e) = session
        .wait_for(&Locator::css("body"), &[], timings.body_timeout)
        .await
    {
        warn!("Failed to handle cookie consent: {}", e);
        if let Some(dir) = debug_dir {
            save_debug_artifacts(session, dir, "cookie_consent_error").await;
        }
        return false;
    }

    let agree = Locator::xpath(AGREE_BUTTON);
    match click_when_ready(session, &agree, timings.agree_timeout).await {
        Ok(()) => {
            info!("Cookie consent accepted");
            tokio::time::sleep(timings.after_agree).await;
            return true;
        }
        Err(e) => warn!("Could not click consent AGREE button: {}", e),
    }

    let close = Locator::xpath(CLOSE_BUTTON);
    match click_when_ready(session, &close, timings.close_timeout).await {
        Ok(()) => {
            info!("Closed cookie consent dialog");
            tokio::time::sleep(timings.after_close).await;
            true
        }
        Err(e) => {
            warn!("Could not close consent dialog: {}", e);
            false
        }
    }
}

async fn click_when_ready<S: Session + ?Sized>(
    session: &mut S,
    locator: &Locator,
    timeout: std::time::Duration,
) -> crate::error::Result<()> {
    session.wait_for_clickable(locator, &[], timeout).await?;
    session.click(locator).await
}

/// Whether a captcha challenge is currently displayed.
pub async fn captcha_present<S: Session + ?Sized>(session: &mut S) -> bool {
    match session.query(&Locator::css(CAPTCHA), &[]).await {
        Ok(found) => found.iter().any(|el| el.displayed),
        Err(_) => false,
    }
}

async fn save_debug_artifacts<S: Session + ?Sized>(session: &mut S, dir: &Path, stem: &str) {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!("Cannot create debug dir {:?}: {}", dir, e);
        return;
    }

    let png = dir.join(format!("{}.png", stem));
    match session.screenshot(&png).await {
        Ok(()) => info!("Screenshot saved to {:?}", png),
        Err(e) => warn!("Failed to capture screenshot: {}", e),
    }

    let html = dir.join(format!("{}.html", stem));
    match session.page_source().await {
        Ok(source) => match tokio::fs::write(&html, source).await {
            Ok(()) => info!("HTML content saved to {:?}", html),
            Err(e) => warn!("Failed to write {:?}: {}", html, e),
        },
        Err(e) => warn!("Failed to read page source: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whoscored::testing::{disabled, element, FakePage, FakeSession};
    use crate::whoscored::ScrapeSettings;

    const PAGE: &str = "https://example.test/season";

    fn timings() -> ConsentTimings {
        ScrapeSettings::instant().consent
    }

    #[tokio::test]
    async fn test_agree_button_wins() {
        let page = FakePage::single(vec![
            (Locator::css("body"), vec![element("", &[])]),
            (Locator::xpath(AGREE_BUTTON), vec![element("AGREE", &[])]),
            (Locator::xpath(CLOSE_BUTTON), vec![element("", &[])]),
        ]);
        let mut session = FakeSession::new().with_page(PAGE, page);
        session.navigate(PAGE).await.unwrap();

        assert!(dismiss(&mut session, &timings(), None).await);
        assert_eq!(session.clicks, vec![Locator::xpath(AGREE_BUTTON)]);
    }

    #[tokio::test]
    async fn test_falls_back_to_close_button() {
        let page = FakePage::single(vec![
            (Locator::css("body"), vec![element("", &[])]),
            (Locator::xpath(AGREE_BUTTON), vec![disabled(element("AGREE", &[]))]),
            (Locator::xpath(CLOSE_BUTTON), vec![element("", &[])]),
        ]);
        let mut session = FakeSession::new().with_page(PAGE, page);
        session.navigate(PAGE).await.unwrap();

        assert!(dismiss(&mut session, &timings(), None).await);
        assert_eq!(session.clicks, vec![Locator::xpath(CLOSE_BUTTON)]);
    }

    #[tokio::test]
    async fn test_no_overlay_reports_failure_without_error() {
        let page = FakePage::single(vec![(Locator::css("body"), vec![element("", &[])])]);
        let mut session = FakeSession::new().with_page(PAGE, page);
        session.navigate(PAGE).await.unwrap();

        assert!(!dismiss(&mut session, &timings(), None).await);
        assert!(session.clicks.is_empty());
    }

    #[tokio::test]
    async fn test_missing_body_gives_up_early() {
        let mut session = FakeSession::new().with_page(PAGE, FakePage::default());
        session.navigate(PAGE).await.unwrap();

        assert!(!dismiss(&mut session, &timings(), None).await);
        assert!(session.clicks.is_empty());
    }

    #[tokio::test]
    async fn test_captcha_detection() {
        let mut hidden = element("", &[]);
        hidden.displayed = false;
        let page = FakePage::single(vec![(Locator::css(CAPTCHA), vec![hidden])]);
        let mut session = FakeSession::new().with_page(PAGE, page);
        session.navigate(PAGE).await.unwrap();
        assert!(!captcha_present(&mut session).await);

        let page = FakePage::single(vec![(Locator::css(CAPTCHA), vec![element("", &[])])]);
        session.pages.insert(PAGE.to_string(), page);
        assert!(captcha_present(&mut session).await);
    }
}
