use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Card shown in a `Card` event, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardType {
    Red,
    SecondYellow,
    Yellow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HomeAway {
    #[serde(rename = "h")]
    Home,
    #[serde(rename = "a")]
    Away,
}

/// One on-ball event of a match, flattened from the match payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub game: String,
    pub game_id: i64,
    pub score: Option<String>,
    pub event_id: Option<i64>,
    pub period_id: Option<i64>,
    pub team_id: Option<i64>,
    pub player_id: Option<i64>,
    pub player_name: Option<String>,
    pub type_id: Option<i64>,
    pub date: Option<String>,
    pub minute: Option<i64>,
    pub second: Option<i64>,
    /// `outcomeType.value == 1`
    pub outcome: bool,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub end_x: Option<f64>,
    pub end_y: Option<f64>,
    #[serde(default)]
    pub qualifiers: Value,
    pub touch: Option<bool>,
    pub shot: bool,
    pub goal: bool,
    pub type_name: Option<String>,

    // Filled in by preprocessing.
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub h_a: Option<HomeAway>,
    #[serde(default)]
    pub card_type: Option<CardType>,
    #[serde(default)]
    pub xt_added: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub game_id: i64,
    pub game: String,
    pub league: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRef {
    pub id: i64,
    pub name: String,
}

/// A processed match: event rows plus summary and the teams named in the payload.
#[derive(Debug, Clone)]
pub struct MatchEvents {
    pub info: GameInfo,
    pub events: Vec<EventRecord>,
    /// Home first, when the payload names both sides.
    pub teams: Vec<TeamRef>,
}

/// Game slug from a match link: the last path segment after the season year,
/// e.g. `.../England-Premier-League-2024-2025-Arsenal-Chelsea` → `Arsenal-Chelsea`.
pub fn game_slug(link: &str, year: i32) -> String {
    let segment = link
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(link);
    let marker = format!("{}-", year);
    match segment.find(&marker) {
        Some(idx) => segment[idx + marker.len()..].to_string(),
        None => segment.to_string(),
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

fn as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Flatten a match payload into event rows.
pub fn process_match_data(
    link: &str,
    payload: &Value,
    league: &str,
    year: i32,
) -> Result<MatchEvents> {
    let game = game_slug(link, year);
    let game_id = as_i64(&payload["matchId"]).context("payload has no matchId")?;
    let centre = payload
        .get("matchCentreData")
        .filter(|v| v.is_object())
        .context("payload has no matchCentreData")?;

    let players = &centre["playerIdNameDictionary"];
    let date = as_string(&centre["startDate"]);
    let score = as_string(&centre["score"]);

    let events = centre["events"]
        .as_array()
        .map(|events| {
            events
                .iter()
                .map(|ev| {
                    let player_id = as_i64(&ev["playerId"]);
                    EventRecord {
                        game: game.clone(),
                        game_id,
                        score: score.clone(),
                        event_id: as_i64(&ev["id"]),
                        period_id: as_i64(&ev["period"]["value"]),
                        team_id: as_i64(&ev["teamId"]),
                        player_id,
                        player_name: player_id
                            .and_then(|id| players[id.to_string()].as_str())
                            .map(String::from),
                        type_id: as_i64(&ev["eventId"]),
                        date: date.clone(),
                        minute: as_i64(&ev["minute"]),
                        second: as_i64(&ev["second"]),
                        outcome: as_i64(&ev["outcomeType"]["value"]) == Some(1),
                        x: ev["x"].as_f64(),
                        y: ev["y"].as_f64(),
                        end_x: ev["endX"].as_f64(),
                        end_y: ev["endY"].as_f64(),
                        qualifiers: ev.get("qualifiers").cloned().unwrap_or(Value::Null),
                        touch: ev["isTouch"].as_bool(),
                        shot: ev["isShot"].as_bool().unwrap_or(false),
                        goal: ev["isGoal"].as_bool().unwrap_or(false),
                        type_name: ev["type"]["displayName"].as_str().map(String::from),
                        league: None,
                        team_name: None,
                        h_a: None,
                        card_type: None,
                        xt_added: 0.0,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let teams = ["home", "away"]
        .iter()
        .filter_map(|side| {
            let team = &centre[*side];
            Some(TeamRef {
                id: as_i64(&team["teamId"])?,
                name: team["name"].as_str()?.to_string(),
            })
        })
        .collect();

    Ok(MatchEvents {
        info: GameInfo {
            game_id,
            game,
            league: league.to_string(),
        },
        events,
        teams,
    })
}
