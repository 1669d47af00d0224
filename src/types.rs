//! Shared types for the STACKER optimizer.
//!
//! These types form the data model used across all modules. Players are
//! built once per run and shared behind `Arc`; stacks and lineups reference
//! them without copying.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::optimizer::scoring;

// ---------------------------------------------------------------------------
// Positions and roster slots
// ---------------------------------------------------------------------------

/// Player position as listed by the salary platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    DST,
}

impl Position {
    /// WR or TE: the positions that can complete a QB stack.
    pub fn is_pass_catcher(&self) -> bool {
        matches!(self, Position::WR | Position::TE)
    }

    /// Positions allowed in the FLEX slot.
    pub fn is_flex_eligible(&self) -> bool {
        matches!(self, Position::RB | Position::WR | Position::TE)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::QB => write!(f, "QB"),
            Position::RB => write!(f, "RB"),
            Position::WR => write!(f, "WR"),
            Position::TE => write!(f, "TE"),
            Position::DST => write!(f, "DST"),
        }
    }
}

/// Parse a position code (case-insensitive). Defense accepts the common
/// spellings used by projection and salary sources.
impl std::str::FromStr for Position {
    type Err = StackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Ok(Position::QB),
            "RB" => Ok(Position::RB),
            "WR" => Ok(Position::WR),
            "TE" => Ok(Position::TE),
            "DST" | "D/ST" | "DEF" | "D" => Ok(Position::DST),
            _ => Err(StackerError::UnknownPosition(s.to_string())),
        }
    }
}

/// One of the nine roster slots of a classic NFL lineup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    Qb,
    Rb1,
    Rb2,
    Wr1,
    Wr2,
    Wr3,
    Te,
    Flex,
    Dst,
}

impl Slot {
    pub const COUNT: usize = 9;

    /// Roster order used for storage and export.
    pub const ALL: [Slot; Slot::COUNT] = [
        Slot::Qb,
        Slot::Rb1,
        Slot::Rb2,
        Slot::Wr1,
        Slot::Wr2,
        Slot::Wr3,
        Slot::Te,
        Slot::Flex,
        Slot::Dst,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether a player at `position` may fill this slot.
    pub fn accepts(self, position: Position) -> bool {
        match self {
            Slot::Qb => position == Position::QB,
            Slot::Rb1 | Slot::Rb2 => position == Position::RB,
            Slot::Wr1 | Slot::Wr2 | Slot::Wr3 => position == Position::WR,
            Slot::Te => position == Position::TE,
            Slot::Flex => position.is_flex_eligible(),
            Slot::Dst => position == Position::DST,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Slot::Qb => "QB",
            Slot::Rb1 => "RB1",
            Slot::Rb2 => "RB2",
            Slot::Wr1 => "WR1",
            Slot::Wr2 => "WR2",
            Slot::Wr3 => "WR3",
            Slot::Te => "TE",
            Slot::Flex => "FLEX",
            Slot::Dst => "DST",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Optimization metric
// ---------------------------------------------------------------------------

/// Which per-player number the optimizer maximises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMetric {
    #[default]
    Projected,
    RiskAdjusted,
    BoomScore,
}

impl fmt::Display for OptimizationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationMetric::Projected => write!(f, "projected"),
            OptimizationMetric::RiskAdjusted => write!(f, "risk_adjusted"),
            OptimizationMetric::BoomScore => write!(f, "boom_score"),
        }
    }
}

impl std::str::FromStr for OptimizationMetric {
    type Err = StackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "projected" => Ok(OptimizationMetric::Projected),
            "risk_adjusted" => Ok(OptimizationMetric::RiskAdjusted),
            "boom_score" | "boom" => Ok(OptimizationMetric::BoomScore),
            other => Err(StackerError::InvalidConfig(format!(
                "unknown optimization metric '{other}' (expected projected | risk_adjusted | boom_score)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Raw projection numbers for one player. Percentages are on a 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Projection {
    pub projected_score: f64,
    pub bust_score: f64,
    pub boom_score: f64,
    pub bust_percentage: f64,
    pub boom_percentage: f64,
}

impl Projection {
    /// A projection with no bust/boom distribution.
    pub fn projected_only(projected_score: f64) -> Self {
        Self {
            projected_score,
            ..Self::default()
        }
    }

    /// True when any bust/boom field carries data.
    pub fn has_distribution(&self) -> bool {
        self.bust_score != 0.0
            || self.boom_score != 0.0
            || self.bust_percentage != 0.0
            || self.boom_percentage != 0.0
    }
}

/// A scored player. Immutable once built; derived metrics are computed in
/// [`Player::new`] and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    /// Salary-platform identifier ("Name (12345)"), used for export when present.
    pub platform_id: Option<String>,
    pub team: String,
    pub opponent: String,
    pub position: Position,
    pub salary: u32,
    /// Projection with percentages clamped into range.
    pub projection: Projection,
    pub risk_adjusted_score: f64,
    pub upside_potential: f64,
    /// Projected points per $1,000 of salary.
    pub value_ratio: f64,
}

/// Players are shared between stacks, builder state and lineups.
pub type PlayerRef = Arc<Player>;

/// Highest salary a single player record may carry.
pub const MAX_PLAYER_SALARY: u32 = 100_000;

impl Player {
    pub fn new(
        name: impl Into<String>,
        team: impl Into<String>,
        opponent: impl Into<String>,
        position: Position,
        salary: u32,
        projection: Projection,
    ) -> Result<Self, StackerError> {
        let name = name.into().trim().to_string();
        let team = team.into().trim().to_uppercase();
        let opponent = opponent.into().trim().to_uppercase();

        if name.is_empty() {
            return Err(StackerError::InvalidRecord {
                name: "<unnamed>".into(),
                reason: "missing player name".into(),
            });
        }
        if team.is_empty() {
            return Err(StackerError::InvalidRecord {
                name,
                reason: "missing team".into(),
            });
        }
        if salary == 0 {
            return Err(StackerError::InvalidRecord {
                name,
                reason: "salary must be positive".into(),
            });
        }
        if salary > MAX_PLAYER_SALARY {
            return Err(StackerError::InvalidRecord {
                name,
                reason: format!("salary ${salary} out of range (max ${MAX_PLAYER_SALARY})"),
            });
        }
        if !projection.projected_score.is_finite() {
            return Err(StackerError::InvalidRecord {
                name,
                reason: "projected score is not a finite number".into(),
            });
        }

        let projection = scoring::normalize_projection(projection);
        let derived = scoring::derive_metrics(salary, &projection);

        Ok(Self {
            name,
            platform_id: None,
            team,
            opponent,
            position,
            salary,
            projection,
            risk_adjusted_score: derived.risk_adjusted_score,
            upside_potential: derived.upside_potential,
            value_ratio: derived.value_ratio,
        })
    }

    /// Attach the salary-platform identifier.
    pub fn with_platform_id(mut self, platform_id: impl Into<String>) -> Self {
        let id = platform_id.into();
        if !id.trim().is_empty() {
            self.platform_id = Some(id.trim().to_string());
        }
        self
    }

    /// Stable identity inside one pool.
    pub fn id(&self) -> &str {
        self.platform_id.as_deref().unwrap_or(&self.name)
    }

    pub fn projected_score(&self) -> f64 {
        self.projection.projected_score
    }

    pub fn boom_score(&self) -> f64 {
        self.projection.boom_score
    }

    pub fn bust_score(&self) -> f64 {
        self.projection.bust_score
    }

    /// The player's value under the given optimization metric.
    pub fn metric(&self, metric: OptimizationMetric) -> f64 {
        match metric {
            OptimizationMetric::Projected => self.projection.projected_score,
            OptimizationMetric::RiskAdjusted => self.risk_adjusted_score,
            OptimizationMetric::BoomScore => self.projection.boom_score,
        }
    }

    /// A non-DST player priced at or below `floor`.
    pub fn is_cheap(&self, floor: u32) -> bool {
        self.position != Position::DST && self.salary <= floor
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {}, ${}, {:.1} pts)",
            self.name, self.team, self.position, self.salary, self.projection.projected_score
        )
    }
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// A quarterback paired with a same-team WR or TE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    pub quarterback: PlayerRef,
    pub pass_catcher: PlayerRef,
    /// Metric `combined_score` was computed under.
    pub metric: OptimizationMetric,
    pub combined_salary: u32,
    pub combined_score: f64,
    pub correlation_score: f64,
    /// Combined projected points per $1,000.
    pub value_ratio: f64,
    /// Combined salary inside the configured stack band.
    pub is_optimal: bool,
}

impl Stack {
    /// "QB id + catcher id", unique per pool.
    pub fn key(&self) -> String {
        format!("{}+{}", self.quarterback.id(), self.pass_catcher.id())
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.quarterback.id() == player_id || self.pass_catcher.id() == player_id
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {} {} [{}] (${}, {:.2} {}, corr {:.2})",
            self.quarterback.name,
            self.pass_catcher.position,
            self.pass_catcher.name,
            self.quarterback.team,
            self.combined_salary,
            self.combined_score,
            self.metric,
            self.correlation_score,
        )
    }
}

// ---------------------------------------------------------------------------
// Lineup
// ---------------------------------------------------------------------------

/// A full nine-player assignment, one player per [`Slot`], with lineup-level
/// sums computed at construction.
///
/// A `Lineup` is not guaranteed valid; the validator decides that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lineup {
    slots: [PlayerRef; Slot::COUNT],
    /// Key of the stack this lineup was seeded from.
    pub seed: String,
    pub total_salary: u32,
    pub projected_score: f64,
    pub risk_adjusted_score: f64,
    pub boom_score: f64,
    pub bust_score: f64,
    pub upside_potential: f64,
    pub avg_boom_percentage: f64,
    pub avg_bust_percentage: f64,
    pub team_count: usize,
}

impl Lineup {
    /// Build a lineup from players ordered as [`Slot::ALL`].
    pub fn from_slots(slots: [PlayerRef; Slot::COUNT], seed: impl Into<String>) -> Self {
        let n = Slot::COUNT as f64;
        let total_salary = slots
            .iter()
            .fold(0u32, |total, p| total.saturating_add(p.salary));
        let projected_score = slots.iter().map(|p| p.projected_score()).sum();
        let risk_adjusted_score = slots.iter().map(|p| p.risk_adjusted_score).sum();
        let boom_score = slots.iter().map(|p| p.boom_score()).sum();
        let bust_score = slots.iter().map(|p| p.bust_score()).sum();
        let upside_potential = slots.iter().map(|p| p.upside_potential).sum();
        let avg_boom_percentage =
            slots.iter().map(|p| p.projection.boom_percentage).sum::<f64>() / n;
        let avg_bust_percentage =
            slots.iter().map(|p| p.projection.bust_percentage).sum::<f64>() / n;
        let team_count = slots
            .iter()
            .map(|p| p.team.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len();

        Self {
            slots,
            seed: seed.into(),
            total_salary,
            projected_score,
            risk_adjusted_score,
            boom_score,
            bust_score,
            upside_potential,
            avg_boom_percentage,
            avg_bust_percentage,
            team_count,
        }
    }

    pub fn player(&self, slot: Slot) -> &PlayerRef {
        &self.slots[slot.index()]
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerRef> {
        self.slots.iter()
    }

    /// (slot, player) pairs in roster order.
    pub fn assignments(&self) -> impl Iterator<Item = (Slot, &PlayerRef)> {
        Slot::ALL.iter().copied().zip(self.slots.iter())
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.slots.iter().any(|p| p.id() == player_id)
    }

    /// Sorted player ids. Two lineups with the same key hold the same nine players.
    pub fn player_key(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.slots.iter().map(|p| p.id().to_string()).collect();
        ids.sort();
        ids
    }

    /// Lineup total under an optimization metric.
    pub fn metric_total(&self, metric: OptimizationMetric) -> f64 {
        match metric {
            OptimizationMetric::Projected => self.projected_score,
            OptimizationMetric::RiskAdjusted => self.risk_adjusted_score,
            OptimizationMetric::BoomScore => self.boom_score,
        }
    }

    /// Player count per team.
    pub fn team_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for p in &self.slots {
            *counts.entry(p.team.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl fmt::Display for Lineup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lineup({:.2} pts, ${}, {} teams)",
            self.projected_score, self.total_salary, self.team_count
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for STACKER.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StackerError {
    #[error("Invalid player record ({name}): {reason}")]
    InvalidRecord { name: String, reason: String },

    #[error("Unknown position code: {0}")]
    UnknownPosition(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_player(name: &str, team: &str, position: Position, salary: u32) -> PlayerRef {
        Arc::new(
            Player::new(name, team, "OPP", position, salary, Projection::projected_only(10.0))
                .unwrap(),
        )
    }

    #[test]
    fn test_position_parse_aliases() {
        assert_eq!("qb".parse::<Position>().unwrap(), Position::QB);
        assert_eq!("D/ST".parse::<Position>().unwrap(), Position::DST);
        assert_eq!(" DEF ".parse::<Position>().unwrap(), Position::DST);
        assert!(matches!(
            "K".parse::<Position>(),
            Err(StackerError::UnknownPosition(_))
        ));
    }

    #[test]
    fn test_slot_eligibility() {
        assert!(Slot::Flex.accepts(Position::WR));
        assert!(Slot::Flex.accepts(Position::RB));
        assert!(Slot::Flex.accepts(Position::TE));
        assert!(!Slot::Flex.accepts(Position::QB));
        assert!(!Slot::Flex.accepts(Position::DST));
        assert!(Slot::Rb2.accepts(Position::RB));
        assert!(!Slot::Wr1.accepts(Position::TE));
    }

    #[test]
    fn test_slot_order_matches_index() {
        for (i, slot) in Slot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }

    #[test]
    fn test_metric_parse_and_display() {
        let m: OptimizationMetric = "risk_adjusted".parse().unwrap();
        assert_eq!(m, OptimizationMetric::RiskAdjusted);
        assert_eq!(OptimizationMetric::BoomScore.to_string(), "boom_score");
        assert!("ceiling".parse::<OptimizationMetric>().is_err());
    }

    #[test]
    fn test_metric_serde_snake_case() {
        let json = serde_json::to_string(&OptimizationMetric::RiskAdjusted).unwrap();
        assert_eq!(json, "\"risk_adjusted\"");
    }

    #[test]
    fn test_player_rejects_zero_salary() {
        let err = Player::new("A", "KC", "BUF", Position::WR, 0, Projection::default());
        assert!(matches!(err, Err(StackerError::InvalidRecord { .. })));
    }

    #[test]
    fn test_player_rejects_salary_out_of_range() {
        let err = Player::new("A", "KC", "BUF", Position::QB, 3_000_000_000, Projection::default());
        match err {
            Err(StackerError::InvalidRecord { reason, .. }) => assert!(reason.contains("out of range")),
            other => panic!("expected InvalidRecord, got {other:?}"),
        }
        assert!(Player::new("A", "KC", "BUF", Position::QB, MAX_PLAYER_SALARY, Projection::default()).is_ok());
    }

    #[test]
    fn test_lineup_salary_saturates() {
        let huge = Arc::new(Player {
            salary: u32::MAX,
            ..(*make_player("huge", "A", Position::QB, 7000)).clone()
        });
        let slots = [
            huge,
            make_player("rb1", "B", Position::RB, 6000),
            make_player("rb2", "C", Position::RB, 5000),
            make_player("wr1", "A", Position::WR, 6000),
            make_player("wr2", "D", Position::WR, 5000),
            make_player("wr3", "E", Position::WR, 4000),
            make_player("te", "F", Position::TE, 4000),
            make_player("flex", "B", Position::RB, 4500),
            make_player("dst", "G", Position::DST, 3000),
        ];
        assert_eq!(Lineup::from_slots(slots, "s").total_salary, u32::MAX);
    }

    #[test]
    fn test_player_rejects_missing_team() {
        let err = Player::new("A", "  ", "BUF", Position::WR, 4000, Projection::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_player_id_prefers_platform_id() {
        let p = Player::new("Josh Allen", "buf", "kc", Position::QB, 8000, Projection::default())
            .unwrap()
            .with_platform_id("Josh Allen (123)");
        assert_eq!(p.id(), "Josh Allen (123)");
        assert_eq!(p.team, "BUF");
        assert_eq!(p.opponent, "KC");
    }

    #[test]
    fn test_cheap_excludes_dst() {
        let dst = make_player("Bills", "BUF", Position::DST, 2500);
        let wr = make_player("Cheap WR", "BUF", Position::WR, 3500);
        assert!(!dst.is_cheap(4000));
        assert!(wr.is_cheap(4000));
        assert!(!wr.is_cheap(3000));
    }

    #[test]
    fn test_lineup_aggregates() {
        let slots = [
            make_player("qb", "A", Position::QB, 7000),
            make_player("rb1", "B", Position::RB, 6000),
            make_player("rb2", "C", Position::RB, 5000),
            make_player("wr1", "A", Position::WR, 6000),
            make_player("wr2", "D", Position::WR, 5000),
            make_player("wr3", "E", Position::WR, 4000),
            make_player("te", "F", Position::TE, 4000),
            make_player("flex", "B", Position::RB, 4500),
            make_player("dst", "G", Position::DST, 3000),
        ];
        let lineup = Lineup::from_slots(slots, "qb+wr1");
        assert_eq!(lineup.total_salary, 44_500);
        assert!((lineup.projected_score - 90.0).abs() < 1e-9);
        assert_eq!(lineup.team_count, 7);
        assert_eq!(lineup.player(Slot::Flex).name, "flex");
        assert_eq!(lineup.team_counts().get("A"), Some(&2));
        assert_eq!(lineup.player_key().len(), 9);
        assert!(lineup.contains("dst"));
    }
}
