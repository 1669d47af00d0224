//! Lineup quality score.
//!
//! A weighted sum of six components:
//!
//! | Component          | Raw value                                      |
//! |--------------------|------------------------------------------------|
//! | primary            | lineup total under the effective metric        |
//! | salary utilization | `min(1, salary / cap)`                         |
//! | salary efficiency  | primary per $10,000 of salary                  |
//! | team diversity     | 1 inside the team band, linear falloff outside |
//! | flex quality       | FLEX position preference (WR > RB > TE)        |
//! | upside             | average upside per player over `upside_scale`  |
//!
//! Weights come from [`QualityWeights`](crate::config::QualityWeights) and
//! are validated to sum to one before any lineup is scored.

use serde::{Deserialize, Serialize};

use crate::config::{DiversityBand, OptimizerConfig};
use crate::types::{Lineup, OptimizationMetric, Slot};

/// Unweighted component values for one lineup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub primary: f64,
    pub salary_utilization: f64,
    pub salary_efficiency: f64,
    pub team_diversity: f64,
    pub flex_quality: f64,
    pub upside: f64,
}

/// A validated lineup with its quality score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredLineup {
    pub lineup: Lineup,
    pub quality_score: f64,
    pub breakdown: QualityBreakdown,
}

pub struct QualityScorer {
    config: OptimizerConfig,
    metric: OptimizationMetric,
}

impl QualityScorer {
    pub fn new(config: OptimizerConfig, metric: OptimizationMetric) -> Self {
        Self { config, metric }
    }

    pub fn breakdown(&self, lineup: &Lineup) -> QualityBreakdown {
        let primary = lineup.metric_total(self.metric);
        let salary = lineup.total_salary as f64;
        let cap = self.config.roster.salary_cap as f64;

        let salary_utilization = (salary / cap).min(1.0);
        let salary_efficiency = if salary > 0.0 {
            primary / (salary / 10_000.0)
        } else {
            0.0
        };
        let team_diversity = diversity_credit(lineup.team_count, &self.config.diversity);
        let flex_quality = self
            .config
            .quality
            .flex_preference(lineup.player(Slot::Flex).position);
        let avg_upside = lineup.upside_potential / Slot::COUNT as f64;
        let upside = (avg_upside / self.config.quality.upside_scale).clamp(0.0, 1.0);

        QualityBreakdown {
            primary,
            salary_utilization,
            salary_efficiency,
            team_diversity,
            flex_quality,
            upside,
        }
    }

    pub fn quality(&self, breakdown: &QualityBreakdown) -> f64 {
        let w = &self.config.weights;
        breakdown.primary * w.primary
            + breakdown.salary_utilization * w.salary_utilization
            + breakdown.salary_efficiency * w.salary_efficiency
            + breakdown.team_diversity * w.team_diversity
            + breakdown.flex_quality * w.flex_quality
            + breakdown.upside * w.upside
    }

    pub fn score(&self, lineup: Lineup) -> ScoredLineup {
        let breakdown = self.breakdown(&lineup);
        ScoredLineup {
            quality_score: self.quality(&breakdown),
            breakdown,
            lineup,
        }
    }
}

/// Full credit inside `[min_teams, max_teams]`, minus `falloff_per_team` for
/// each team of distance outside it, floored at zero.
pub fn diversity_credit(teams: usize, band: &DiversityBand) -> f64 {
    let distance = if teams < band.min_teams {
        band.min_teams - teams
    } else if teams > band.max_teams {
        teams - band.max_teams
    } else {
        0
    };
    (1.0 - distance as f64 * band.falloff_per_team).max(0.0)
}
