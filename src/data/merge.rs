//! Projection ⋈ salary join.
//!
//! Projections (name/team/position plus bust/boom distribution) come from
//! one source; salaries, platform ids and the game slate from the salary
//! platform's export. Rows are matched on a cleaned name plus position, and
//! the opponent is read from the platform's "AWAY@HOME ..." game info.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::PlayerRecord;
use crate::types::Position;

/// Generational suffixes dropped from names before matching.
const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "v"];

/// One row of the projection source.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectionRow {
    #[serde(alias = "player_name")]
    pub name: String,
    pub team: Option<String>,
    pub opponent: Option<String>,
    pub position: String,
    #[serde(alias = "projected_points")]
    pub projected_score: Option<f64>,
    pub bust_score: Option<f64>,
    pub boom_score: Option<f64>,
    pub bust_percentage: Option<f64>,
    pub boom_percentage: Option<f64>,
}

/// One row of the salary platform's export, keyed by its column headers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SalaryRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Name + ID")]
    pub name_id: Option<String>,
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "Salary")]
    pub salary: Option<f64>,
    #[serde(rename = "Game Info")]
    pub game_info: Option<String>,
    #[serde(rename = "TeamAbbrev")]
    pub team: Option<String>,
}

/// Joined records plus the projection rows that found no salary.
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    pub records: Vec<PlayerRecord>,
    pub unmatched: Vec<String>,
}

/// Normalize a player name for matching across sources: platform ids in
/// parentheses, punctuation, generational suffixes and a trailing "D/ST"
/// are removed and the rest is lowercased.
pub fn clean_player_name(name: &str) -> String {
    let mut without_ids = String::with_capacity(name.len());
    let mut depth = 0usize;
    for c in name.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => without_ids.push(c),
            _ => {}
        }
    }

    let lowered = without_ids.to_lowercase().replace("d/st", " ");
    let letters: String = lowered
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let words: Vec<&str> = letters
        .split_whitespace()
        .filter(|w| !NAME_SUFFIXES.contains(w))
        .filter(|w| *w != "dst")
        .collect();
    words.join(" ")
}

/// Position label shared by both sources ("D/ST", "DEF" → "DST").
fn position_key(raw: &str) -> String {
    raw.parse::<Position>()
        .map(|p| p.to_string())
        .unwrap_or_else(|_| raw.trim().to_uppercase())
}

/// Opponent of `team` in an "AWAY@HOME date time" game string.
pub fn opponent_from_game_info(game_info: &str, team: &str) -> Option<String> {
    let matchup = game_info.split_whitespace().next()?;
    let (away, home) = matchup.split_once('@')?;
    let team = team.trim();
    if team.eq_ignore_ascii_case(home) {
        Some(away.to_uppercase())
    } else if team.eq_ignore_ascii_case(away) {
        Some(home.to_uppercase())
    } else {
        None
    }
}

/// Inner join of projections and salaries on (cleaned name, position).
///
/// The salary row supplies salary, platform id, team and game info; the
/// projection row supplies the scores. When a key occurs more than once on
/// the salary side the first row wins.
pub fn merge_sources(projections: &[ProjectionRow], salaries: &[SalaryRow]) -> MergeResult {
    let mut by_key: HashMap<(String, String), &SalaryRow> = HashMap::new();
    for row in salaries {
        let key = (clean_player_name(&row.name), position_key(&row.position));
        by_key.entry(key).or_insert(row);
    }

    let mut result = MergeResult::default();
    for proj in projections {
        let key = (clean_player_name(&proj.name), position_key(&proj.position));
        let Some(salary) = by_key.get(&key) else {
            debug!(player = %proj.name, position = %proj.position, "No salary match");
            result.unmatched.push(proj.name.clone());
            continue;
        };

        let team = salary
            .team
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| proj.team.clone());
        let opponent = match (&salary.game_info, &team) {
            (Some(info), Some(team)) => opponent_from_game_info(info, team),
            _ => None,
        }
        .or_else(|| proj.opponent.clone());

        result.records.push(PlayerRecord {
            name: Some(proj.name.trim().to_string()),
            platform_id: salary.name_id.clone(),
            team,
            opponent,
            game_info: salary.game_info.clone(),
            position: Some(key.1),
            salary: salary.salary,
            projected_score: proj.projected_score,
            bust_score: proj.bust_score,
            boom_score: proj.boom_score,
            bust_percentage: proj.bust_percentage,
            boom_percentage: proj.boom_percentage,
        });
    }

    info!(
        projections = projections.len(),
        salaries = salaries.len(),
        matched = result.records.len(),
        unmatched = result.unmatched.len(),
        "Projection/salary join complete"
    );
    result
}
