//! Scoring model.
//!
//! Derives the composite per-player metrics (risk-adjusted score, upside,
//! value ratio) from raw projections, and decides whether a requested
//! optimization metric is backed by the data actually present in the pool.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{OptimizationMetric, PlayerRef, Projection};

/// Metrics computed once per player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub risk_adjusted_score: f64,
    pub upside_potential: f64,
    pub value_ratio: f64,
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Clamp percentages into [0, 100] and make bust + boom ≤ 100.
/// Any excess is taken off the boom percentage.
pub fn normalize_projection(raw: Projection) -> Projection {
    let bust_percentage = clamp_percentage(raw.bust_percentage);
    let boom_percentage = clamp_percentage(raw.boom_percentage).min(100.0 - bust_percentage);
    Projection {
        projected_score: raw.projected_score,
        bust_score: finite_or_zero(raw.bust_score),
        boom_score: finite_or_zero(raw.boom_score),
        bust_percentage,
        boom_percentage,
    }
}

/// Compute the derived metrics for a (normalized) projection.
///
/// Without bust/boom data the risk-adjusted score equals the projection and
/// upside is zero.
pub fn derive_metrics(salary: u32, projection: &Projection) -> DerivedMetrics {
    let risk_adjusted_score = if projection.has_distribution() {
        let bust = projection.bust_percentage / 100.0;
        let boom = projection.boom_percentage / 100.0;
        projection.bust_score * bust
            + projection.projected_score * (1.0 - bust - boom)
            + projection.boom_score * boom
    } else {
        projection.projected_score
    };

    let upside_potential = if projection.boom_score > 0.0 {
        (projection.boom_score - projection.projected_score).max(0.0)
    } else {
        0.0
    };

    let value_ratio = if salary > 0 {
        projection.projected_score / (salary as f64 / 1000.0)
    } else {
        0.0
    };

    DerivedMetrics {
        risk_adjusted_score,
        upside_potential,
        value_ratio,
    }
}

// ---------------------------------------------------------------------------
// Metric resolution
// ---------------------------------------------------------------------------

/// Outcome of checking a requested metric against the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResolution {
    pub requested: OptimizationMetric,
    pub effective: OptimizationMetric,
    /// Why the effective metric differs from the requested one.
    pub fallback_reason: Option<String>,
}

impl MetricResolution {
    pub fn honoured(metric: OptimizationMetric) -> Self {
        Self {
            requested: metric,
            effective: metric,
            fallback_reason: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.requested != self.effective
    }
}

/// Decide which metric the run will actually optimise.
///
/// `risk_adjusted` needs at least one player with bust/boom data and
/// `boom_score` needs at least one positive boom score; otherwise the run
/// uses `projected` and the substitution is reported.
pub fn resolve_metric(requested: OptimizationMetric, players: &[PlayerRef]) -> MetricResolution {
    let missing = match requested {
        OptimizationMetric::Projected => None,
        OptimizationMetric::RiskAdjusted => {
            if players.iter().any(|p| p.projection.has_distribution()) {
                None
            } else {
                Some("no bust/boom distribution data in the player pool")
            }
        }
        OptimizationMetric::BoomScore => {
            if players.iter().any(|p| p.projection.boom_score > 0.0) {
                None
            } else {
                Some("no boom scores in the player pool")
            }
        }
    };

    match missing {
        None => MetricResolution::honoured(requested),
        Some(reason) => {
            warn!(
                requested = %requested,
                effective = %OptimizationMetric::Projected,
                reason,
                "Optimization metric not supported by data, falling back"
            );
            MetricResolution {
                requested,
                effective: OptimizationMetric::Projected,
                fallback_reason: Some(format!(
                    "{requested} requested but {reason}; optimizing projected instead"
                )),
            }
        }
    }
}
