//! Player pool input.
//!
//! Turns loosely-typed input records into validated [`Player`]s. A bad row
//! is rejected with a warning and the rest of the pool loads normally.

pub mod merge;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{Player, PlayerRef, Position, Projection, StackerError, MAX_PLAYER_SALARY};
use merge::{merge_sources, opponent_from_game_info, ProjectionRow, SalaryRow};

/// One raw player row. Every field is optional so a malformed row still
/// deserializes and can be rejected with a reason instead of failing the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerRecord {
    pub name: Option<String>,
    pub platform_id: Option<String>,
    pub team: Option<String>,
    pub opponent: Option<String>,
    pub game_info: Option<String>,
    pub position: Option<String>,
    pub salary: Option<f64>,
    pub projected_score: Option<f64>,
    pub bust_score: Option<f64>,
    pub boom_score: Option<f64>,
    pub bust_percentage: Option<f64>,
    pub boom_percentage: Option<f64>,
}

impl PlayerRecord {
    fn label(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("<unnamed>")
            .to_string()
    }

    /// Validate and convert into a [`Player`].
    pub fn into_player(self) -> Result<Player, StackerError> {
        let name = self.label();
        let invalid = |reason: &str| StackerError::InvalidRecord {
            name: name.clone(),
            reason: reason.to_string(),
        };

        let position: Position = self
            .position
            .as_deref()
            .ok_or_else(|| invalid("missing position"))?
            .parse()?;
        let team = self
            .team
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| invalid("missing team"))?;

        let salary = self.salary.ok_or_else(|| invalid("missing salary"))?;
        if !salary.is_finite() || salary <= 0.0 {
            return Err(invalid("salary must be positive"));
        }
        if salary > MAX_PLAYER_SALARY as f64 {
            return Err(invalid("salary out of range"));
        }
        let projected_score = self
            .projected_score
            .ok_or_else(|| invalid("missing projected score"))?;

        let opponent = self
            .opponent
            .clone()
            .filter(|o| !o.trim().is_empty())
            .or_else(|| {
                self.game_info
                    .as_deref()
                    .and_then(|info| opponent_from_game_info(info, &team))
            })
            .unwrap_or_default();

        let projection = Projection {
            projected_score,
            bust_score: self.bust_score.unwrap_or(0.0),
            boom_score: self.boom_score.unwrap_or(0.0),
            bust_percentage: self.bust_percentage.unwrap_or(0.0),
            boom_percentage: self.boom_percentage.unwrap_or(0.0),
        };

        let player = Player::new(
            self.name.unwrap_or_default(),
            team,
            opponent,
            position,
            salary.round() as u32,
            projection,
        )?;
        Ok(match self.platform_id {
            Some(id) => player.with_platform_id(id),
            None => player,
        })
    }
}

/// A row that did not make it into the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position of the row in its input.
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// Validated players plus every rejection.
#[derive(Debug, Clone, Default)]
pub struct PoolLoad {
    pub players: Vec<PlayerRef>,
    pub rejected: Vec<RejectedRecord>,
}

/// Validate every record; reject bad rows and repeated player ids.
pub fn build_pool(records: Vec<PlayerRecord>) -> PoolLoad {
    let total = records.len();
    let mut pool = PoolLoad::default();
    let mut ids: HashSet<String> = HashSet::new();

    for (index, record) in records.into_iter().enumerate() {
        let name = record.label();
        let reason = match record.into_player() {
            Ok(player) if ids.insert(player.id().to_string()) => {
                pool.players.push(Arc::new(player));
                continue;
            }
            Ok(player) => format!("duplicate player id {}", player.id()),
            Err(StackerError::InvalidRecord { reason, .. }) => reason,
            Err(e) => e.to_string(),
        };
        warn!(index, player = %name, reason = %reason, "Rejected player record");
        pool.rejected.push(RejectedRecord {
            index,
            name,
            reason,
        });
    }

    info!(
        records = total,
        players = pool.players.len(),
        rejected = pool.rejected.len(),
        "Player pool built"
    );
    pool
}

fn read_json<T: DeserializeOwned>(path: &str, what: &str) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} from {path}"))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {what} from {path}"))
}

/// Load a pre-joined pool: a JSON array of [`PlayerRecord`]s.
pub fn load_pool(path: &str) -> Result<PoolLoad> {
    let records: Vec<PlayerRecord> = read_json(path, "player pool")?;
    Ok(build_pool(records))
}

/// Load projections and salaries (JSON arrays) and join them into a pool.
pub fn load_merged_pool(projections_path: &str, salaries_path: &str) -> Result<PoolLoad> {
    let projections: Vec<ProjectionRow> = read_json(projections_path, "projections")?;
    let salaries: Vec<SalaryRow> = read_json(salaries_path, "salaries")?;
    let merged = merge_sources(&projections, &salaries);
    if !merged.unmatched.is_empty() {
        warn!(
            count = merged.unmatched.len(),
            "Projected players without salary data were skipped"
        );
    }
    Ok(build_pool(merged.records))
}
