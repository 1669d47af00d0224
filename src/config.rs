//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! field has a default, so a partial file (or none at all) is valid. The
//! optimizer settings form one [`OptimizerConfig`] that is validated once and
//! then handed by value to each pipeline component.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::types::{OptimizationMetric, Position, StackerError};

/// Tolerance used when checking that the quality weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub optimizer: OptimizerConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Where the binary reads its player pool from. Either a pre-joined pool
/// file, or a projections file plus a salaries file to be joined.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct InputConfig {
    pub pool_path: Option<String>,
    pub projections_path: Option<String>,
    pub salaries_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub json_path: String,
    /// Flat lineup table; skipped when unset.
    pub xlsx_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: "stacker_lineups.json".to_string(),
            xlsx_path: Some("stacker_lineups.xlsx".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Optimizer configuration
// ---------------------------------------------------------------------------

/// Every tunable of the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Requested optimization metric; may fall back to `projected`.
    pub metric: OptimizationMetric,
    /// Number of lineups to output.
    pub target_lineups: usize,
    pub roster: RosterRules,
    pub stacks: StackRules,
    pub diversity: DiversityBand,
    pub weights: QualityWeights,
    pub quality: QualityRules,
    pub search: SearchLimits,
    pub exposure: ExposureRules,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            metric: OptimizationMetric::Projected,
            target_lineups: 24,
            roster: RosterRules::default(),
            stacks: StackRules::default(),
            diversity: DiversityBand::default(),
            weights: QualityWeights::default(),
            quality: QualityRules::default(),
            search: SearchLimits::default(),
            exposure: ExposureRules::default(),
        }
    }
}

/// Hard lineup constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterRules {
    pub salary_cap: u32,
    /// Minimum fraction of the cap a lineup must spend.
    pub min_salary_utilization: f64,
    pub max_players_per_team: usize,
    pub min_distinct_teams: usize,
    /// At least one non-DST player must cost this much or less.
    pub cheap_player_salary: u32,
}

impl Default for RosterRules {
    fn default() -> Self {
        Self {
            salary_cap: 50_000,
            min_salary_utilization: 0.96,
            max_players_per_team: 3,
            min_distinct_teams: 4,
            cheap_player_salary: 4_000,
        }
    }
}

impl RosterRules {
    /// Lowest total salary a valid lineup may have.
    pub fn utilization_floor(&self) -> u32 {
        // Small epsilon so 0.96 * 50_000 lands on 48_000, not 48_001.
        let floor = (self.salary_cap as f64 * self.min_salary_utilization - 1e-6).ceil();
        floor.max(0.0) as u32
    }
}

/// Stack search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackRules {
    pub min_salary: u32,
    pub max_salary: u32,
    /// Ranked stacks kept after filtering.
    pub max_candidates: usize,
    /// Seeds taken from the top of the combined-score ranking.
    pub seeds_by_score: usize,
    /// Seeds taken from the top of the value-ratio ranking.
    pub seeds_by_value: usize,
    /// Skip a DST whose team faces the stack's quarterback.
    pub avoid_opposing_dst: bool,
}

impl Default for StackRules {
    fn default() -> Self {
        Self {
            min_salary: 10_000,
            max_salary: 15_000,
            max_candidates: 20,
            seeds_by_score: 2,
            seeds_by_value: 2,
            avoid_opposing_dst: true,
        }
    }
}

impl StackRules {
    pub fn in_band(&self, salary: u32) -> bool {
        (self.min_salary..=self.max_salary).contains(&salary)
    }
}

/// Team-count band that earns full diversity credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityBand {
    pub min_teams: usize,
    pub max_teams: usize,
    /// Credit lost per team outside the band.
    pub falloff_per_team: f64,
}

impl Default for DiversityBand {
    fn default() -> Self {
        Self {
            min_teams: 5,
            max_teams: 7,
            falloff_per_team: 0.35,
        }
    }
}

/// Component weights of the lineup quality score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub primary: f64,
    pub salary_utilization: f64,
    pub salary_efficiency: f64,
    pub team_diversity: f64,
    pub flex_quality: f64,
    pub upside: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            primary: 0.65,
            salary_utilization: 0.15,
            salary_efficiency: 0.05,
            team_diversity: 0.05,
            flex_quality: 0.05,
            upside: 0.05,
        }
    }
}

impl QualityWeights {
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.primary,
            self.salary_utilization,
            self.salary_efficiency,
            self.team_diversity,
            self.flex_quality,
            self.upside,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

/// Non-weight quality parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityRules {
    /// FLEX preference per position.
    pub flex_wr: f64,
    pub flex_rb: f64,
    pub flex_te: f64,
    /// Average upside (points per player) that earns full upside credit.
    pub upside_scale: f64,
}

impl Default for QualityRules {
    fn default() -> Self {
        Self {
            flex_wr: 1.0,
            flex_rb: 0.6,
            flex_te: 0.3,
            upside_scale: 10.0,
        }
    }
}

impl QualityRules {
    pub fn flex_preference(&self, position: Position) -> f64 {
        match position {
            Position::WR => self.flex_wr,
            Position::RB => self.flex_rb,
            Position::TE => self.flex_te,
            Position::QB | Position::DST => 0.0,
        }
    }
}

/// Bounds on the lineup search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Ranked candidates tried per slot before backtracking.
    pub candidate_width: usize,
    /// Search nodes one build may expand before giving up.
    pub max_nodes_per_build: usize,
    /// Extra build attempts (wider search, soft rules dropped) per candidate.
    pub max_retries: u32,
    /// Distinct lineups requested from each seed stack.
    pub lineups_per_seed: usize,
    /// Rounds of the salary-upgrade pass.
    pub upgrade_passes: usize,
    /// Wall-clock bound for the whole search.
    pub time_limit_ms: Option<u64>,
    /// Search seeds on the rayon pool.
    pub parallel: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            candidate_width: 10,
            max_nodes_per_build: 10_000,
            max_retries: 2,
            lineups_per_seed: 18,
            upgrade_passes: 3,
            time_limit_ms: None,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureRules {
    /// Maximum fraction of output lineups any one player may appear in.
    pub max_exposure: Option<f64>,
}

impl OptimizerConfig {
    /// Reject settings that cannot describe a coherent search.
    pub fn validate(&self) -> Result<(), StackerError> {
        let fail = |msg: String| Err(StackerError::InvalidConfig(msg));

        let weights = self.weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return fail(format!("quality weights must be non-negative: {weights:?}"));
        }
        let total = self.weights.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return fail(format!("quality weights must sum to 1.0, got {total}"));
        }

        let roster = &self.roster;
        if roster.salary_cap == 0 {
            return fail("salary cap must be positive".into());
        }
        if !(roster.min_salary_utilization > 0.0 && roster.min_salary_utilization <= 1.0) {
            return fail(format!(
                "min_salary_utilization must be in (0, 1], got {}",
                roster.min_salary_utilization
            ));
        }
        if roster.max_players_per_team < 2 {
            return fail("max_players_per_team must allow a two-player stack".into());
        }
        if roster.min_distinct_teams > crate::types::Slot::COUNT {
            return fail(format!(
                "min_distinct_teams {} exceeds roster size",
                roster.min_distinct_teams
            ));
        }

        if self.stacks.min_salary > self.stacks.max_salary {
            return fail(format!(
                "stack salary band is inverted: {}..{}",
                self.stacks.min_salary, self.stacks.max_salary
            ));
        }
        if self.stacks.seeds_by_score + self.stacks.seeds_by_value == 0 {
            return fail("at least one seed stack is required".into());
        }

        if self.diversity.min_teams > self.diversity.max_teams {
            return fail(format!(
                "diversity band is inverted: {}..{}",
                self.diversity.min_teams, self.diversity.max_teams
            ));
        }
        if self.diversity.falloff_per_team < 0.0 {
            return fail("diversity falloff must be non-negative".into());
        }
        if self.quality.upside_scale <= 0.0 {
            return fail("upside_scale must be positive".into());
        }

        if self.target_lineups == 0 {
            return fail("target_lineups must be at least 1".into());
        }
        if self.search.candidate_width == 0 {
            return fail("candidate_width must be at least 1".into());
        }
        if self.search.max_nodes_per_build == 0 {
            return fail("max_nodes_per_build must be at least 1".into());
        }
        if self.search.lineups_per_seed == 0 {
            return fail("lineups_per_seed must be at least 1".into());
        }
        if let Some(max) = self.exposure.max_exposure {
            if !(max > 0.0 && max <= 1.0) {
                return fail(format!("max_exposure must be in (0, 1], got {max}"));
            }
        }

        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from a TOML file and validate the optimizer section.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
        config.optimizer.validate()?;
        Ok(config)
    }
}
