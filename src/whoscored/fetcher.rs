//! Extract the match payload embedded in a match page's inline script.
//!
//! The page assigns a JavaScript object literal to
//! `require.config.params["args"]`. It is almost JSON: exactly four keys are
//! written as bare identifiers. Those four are quoted and the result is
//! parsed as JSON. If the site starts emitting other bare keys the parse
//! fails loudly and the attempt is retried, then given up.

use regex::Regex;
use std::sync::LazyLock;

use tracing::warn;

use super::consent;
use super::links::MatchPayload;
use super::session::Session;
use crate::error::{Result, ScrapeError};

pub const PAYLOAD_MARKER: &str = "require.config.params[\"args\"]";

const SCRIPT_CONTENTS: &str = "Array.from(document.scripts).map(s => s.innerHTML)";

static BARE_KEYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(^|[{,\s])(matchId|matchCentreData|matchCentreEventTypeJson|formationIdNameMappings)\s*:",
    )
    .expect("valid regex")
});

/// Load `link` and parse its embedded match payload.
pub async fn fetch_match<S: Session + ?Sized>(
    session: &mut S,
    link: &str,
) -> Result<MatchPayload> {
    session.navigate(link).await?;
    if consent::captcha_present(session).await {
        warn!("Captcha detected on {}", link);
    }
    let scripts: Vec<String> =
        serde_json::from_value(session.execute(SCRIPT_CONTENTS).await?)?;
    let script = find_payload_script(&scripts)
        .ok_or_else(|| ScrapeError::ScriptNotFound(link.to_string()))?;
    parse_payload(script)
}

/// The last inline script carrying the payload assignment.
pub fn find_payload_script(scripts: &[String]) -> Option<&str> {
    scripts
        .iter()
        .rev()
        .find(|s| s.contains(PAYLOAD_MARKER))
        .map(String::as_str)
}

/// Turn the payload script into JSON text: right-hand side of the
/// assignment, bare keys quoted, trailing `;` removed.
pub fn repair_payload(script: &str) -> Result<String> {
    let start = script
        .find(PAYLOAD_MARKER)
        .ok_or_else(|| ScrapeError::Payload("payload marker missing".to_string()))?;
    let rest = &script[start + PAYLOAD_MARKER.len()..];
    let eq = rest
        .find('=')
        .ok_or_else(|| ScrapeError::Payload("assignment missing".to_string()))?;
    let rhs = rest[eq + 1..].trim();

    let quoted = BARE_KEYS.replace_all(rhs, "$1\"$2\":");
    Ok(quoted.trim_end().trim_end_matches(';').trim_end().to_string())
}

pub fn parse_payload(script: &str) -> Result<MatchPayload> {
    let text = repair_payload(script)?;
    // Only the first value is the payload; later statements in the same
    // script are ignored.
    let mut values = serde_json::Deserializer::from_str(&text).into_iter::<MatchPayload>();
    match values.next() {
        Some(Ok(payload)) if payload.is_object() => Ok(payload),
        Some(Ok(_)) => Err(ScrapeError::Payload("payload is not an object".to_string())),
        Some(Err(e)) => Err(ScrapeError::Payload(e.to_string())),
        None => Err(ScrapeError::Payload("empty payload".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whoscored::session::Locator;
    use crate::whoscored::testing::{element, FakePage, FakeSession};

    const SCRIPT: &str = r#"
        require.config.params["args"] = {
            matchId:1821060,
            matchCentreData: {"playerIdNameDictionary":{"1":"Saka"},"events":[]},
            matchCentreEventTypeJson: {"shotSixYardBox":0},
            formationIdNameMappings: {"2":"442"}
        };
    "#;

    #[test]
    fn test_parse_payload_quotes_bare_keys() {
        let payload = parse_payload(SCRIPT).unwrap();
        assert_eq!(payload["matchId"], 1821060);
        assert_eq!(
            payload["matchCentreData"]["playerIdNameDictionary"]["1"],
            "Saka"
        );
        assert_eq!(payload["formationIdNameMappings"]["2"], "442");
    }

    #[test]
    fn test_repair_strips_terminator() {
        let text = repair_payload("require.config.params[\"args\"] = {matchId:1};;  ").unwrap();
        assert_eq!(text, r#"{"matchId":1}"#);
    }

    #[test]
    fn test_already_quoted_keys_untouched() {
        let script = r#"require.config.params["args"] = {"matchId": 5, "note": "matchId: x"};"#;
        let payload = parse_payload(script).unwrap();
        assert_eq!(payload["matchId"], 5);
        assert_eq!(payload["note"], "matchId: x");
    }

    #[test]
    fn test_trailing_statements_ignored() {
        let script = "require.config.params[\"args\"] = {matchId:7};\nvar other = 1;";
        assert_eq!(parse_payload(script).unwrap()["matchId"], 7);
    }

    #[test]
    fn test_unknown_bare_key_is_parse_failure() {
        let script = "require.config.params[\"args\"] = {matchId:1, extra:2};";
        let err = parse_payload(script).unwrap_err();
        assert!(matches!(err, ScrapeError::Payload(_)));
    }

    #[test]
    fn test_find_payload_script() {
        let scripts = vec!["var a = 1;".to_string(), SCRIPT.to_string()];
        assert!(find_payload_script(&scripts).is_some());
        assert!(find_payload_script(&scripts[..1]).is_none());
    }

    #[tokio::test]
    async fn test_fetch_match_from_page() {
        let link = "https://www.whoscored.com/Matches/1821060/Live/x";
        let mut session = FakeSession::new()
            .with_page(link, FakePage::with_scripts(vec!["var ga = 1;", SCRIPT]));
        let payload = fetch_match(&mut session, link).await.unwrap();
        assert_eq!(payload["matchId"], 1821060);
    }

    #[tokio::test]
    async fn test_fetch_checks_captcha_after_load() {
        let link = "https://www.whoscored.com/Matches/1821060/Live/x";
        let mut page = FakePage::with_scripts(vec![SCRIPT]);
        page.frames[0].insert(Locator::css("#captcha-container"), vec![element("", &[])]);
        let mut session = FakeSession::new().with_page(link, page);

        let payload = fetch_match(&mut session, link).await.unwrap();

        assert_eq!(payload["matchId"], 1821060);
        assert_eq!(session.queries, vec![Locator::css("#captcha-container")]);
    }

    #[tokio::test]
    async fn test_fetch_match_without_marker() {
        let link = "https://www.whoscored.com/Matches/1/Live/x";
        let mut session =
            FakeSession::new().with_page(link, FakePage::with_scripts(vec!["var ga = 1;"]));
        let err = fetch_match(&mut session, link).await.unwrap_err();
        assert!(matches!(err, ScrapeError::ScriptNotFound(_)));
    }
}
