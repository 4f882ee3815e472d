//! Enrichment of flattened match events: team names, home/away side,
//! card classification and a distance-based expected-threat estimate.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::warn;

use super::events::{CardType, EventRecord, HomeAway, MatchEvents, TeamRef};

/// Reference list of club names and their site team ids.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClubDirectory {
    #[serde(default)]
    pub clubs: Vec<Club>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Club {
    pub name: String,
    pub id: i64,
}

impl ClubDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read club directory {:?}", path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid club directory {:?}", path))
    }

    fn name_of(&self, team_id: i64) -> Option<&str> {
        self.clubs
            .iter()
            .find(|c| c.id == team_id)
            .map(|c| c.name.as_str())
    }

    /// Clubs whose (hyphenated) name occurs in the game slug, in slug order.
    pub fn find_clubs(&self, game: &str) -> Vec<String> {
        let haystack = game.replace(' ', "-").to_lowercase();
        let mut found: Vec<(usize, &str)> = self
            .clubs
            .iter()
            .filter_map(|club| {
                let needle = club.name.replace(' ', "-").to_lowercase();
                haystack.find(&needle).map(|pos| (pos, club.name.as_str()))
            })
            .collect();
        found.sort_by_key(|(pos, _)| *pos);
        found.dedup_by(|a, b| a.1 == b.1);
        found.into_iter().map(|(_, name)| name.to_string()).collect()
    }
}

/// Strongest card among an event's qualifiers.
pub fn card_type(qualifiers: &Value) -> Option<CardType> {
    let names: Vec<&str> = qualifiers
        .as_array()?
        .iter()
        .filter_map(|q| q["type"]["displayName"].as_str())
        .collect();
    if names.contains(&"Red") {
        Some(CardType::Red)
    } else if names.contains(&"SecondYellow") {
        Some(CardType::SecondYellow)
    } else if names.contains(&"Yellow") {
        Some(CardType::Yellow)
    } else {
        None
    }
}

/// Expected threat of a pass from its start position, on the 0–100 pitch:
/// `exp(-0.1 * distance to (100, 50))`. Anything but a pass scores 0.
pub fn expected_threat(event: &EventRecord) -> f64 {
    match (event.type_name.as_deref(), event.x, event.y) {
        (Some("Pass"), Some(x), Some(y)) => {
            let distance = ((100.0 - x).powi(2) + (50.0 - y).powi(2)).sqrt();
            (-0.1 * distance).exp()
        }
        _ => 0.0,
    }
}

fn resolve_sides(
    game: &str,
    directory: &ClubDirectory,
    teams: &[TeamRef],
) -> Option<(String, String)> {
    let clubs = directory.find_clubs(game);
    if clubs.len() == 2 {
        return Some((clubs[0].clone(), clubs[1].clone()));
    }
    warn!("Found {} clubs in '{}', trying payload teams", clubs.len(), game);

    if let [home, away] = teams {
        return Some((home.name.clone(), away.name.clone()));
    }

    match game.split(" - ").collect::<Vec<_>>().as_slice() {
        [home, away] => Some((home.to_string(), away.to_string())),
        _ => None,
    }
}

/// Enrich every event of a match in place and rename the game to
/// `"Home - Away"` when both sides can be identified.
pub fn preprocess_events(matched: &mut MatchEvents, directory: &ClubDirectory) {
    let league = matched.info.league.replace('_', " ");
    let slug = matched.info.game.clone();

    let sides = resolve_sides(&slug, directory, &matched.teams);
    if let Some((home, away)) = &sides {
        matched.info.game = format!("{} - {}", home, away);
    } else {
        warn!("Could not process team names for {}, keeping slug", slug);
    }

    for event in &mut matched.events {
        event.league = Some(league.clone());
        event.game = matched.info.game.clone();

        if let (Some((home, _)), Some(team_id)) = (&sides, event.team_id) {
            let name = directory
                .name_of(team_id)
                .map(String::from)
                .or_else(|| {
                    matched
                        .teams
                        .iter()
                        .find(|t| t.id == team_id)
                        .map(|t| t.name.clone())
                })
                .unwrap_or_else(|| format!("Team_{}", team_id));
            event.h_a = Some(if &name == home {
                HomeAway::Home
            } else {
                HomeAway::Away
            });
            event.team_name = Some(name);
        }

        if event.type_name.as_deref() == Some("Card") {
            event.card_type = card_type(&event.qualifiers);
        }
        event.xt_added = expected_threat(event);
    }
}
