//! Stack finder.
//!
//! Pairs each quarterback with a WR or TE from the same team, scores the
//! pair under the active metric, keeps pairs inside the salary band and
//! ranks them.
//! Ordering is fully deterministic for a given pool.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{OptimizerConfig, StackRules};
use crate::types::{OptimizationMetric, PlayerRef, Position, Stack};

/// Base correlation of a QB-WR pair.
const QB_WR_CORRELATION: f64 = 0.8;
/// Base correlation of a QB-TE pair.
const QB_TE_CORRELATION: f64 = 0.6;

/// QB/pass-catcher correlation: positional base plus half the catcher's
/// boom percentage (as a fraction), capped at 1.0.
pub fn correlation_score(pass_catcher: &PlayerRef) -> f64 {
    let base = match pass_catcher.position {
        Position::WR => QB_WR_CORRELATION,
        Position::TE => QB_TE_CORRELATION,
        _ => 0.0,
    };
    (base + pass_catcher.projection.boom_percentage / 200.0).min(1.0)
}

/// Build a stack from two players. `None` if they are not a same-team
/// QB + WR/TE pair.
pub fn make_stack(
    quarterback: &PlayerRef,
    pass_catcher: &PlayerRef,
    metric: OptimizationMetric,
    rules: &StackRules,
) -> Option<Stack> {
    if quarterback.position != Position::QB
        || !pass_catcher.position.is_pass_catcher()
        || quarterback.team != pass_catcher.team
    {
        return None;
    }

    let combined_salary = quarterback.salary.saturating_add(pass_catcher.salary);
    let combined_projected = quarterback.projected_score() + pass_catcher.projected_score();

    Some(Stack {
        quarterback: Arc::clone(quarterback),
        pass_catcher: Arc::clone(pass_catcher),
        metric,
        combined_salary,
        combined_score: quarterback.metric(metric) + pass_catcher.metric(metric),
        correlation_score: correlation_score(pass_catcher),
        value_ratio: combined_projected / (combined_salary as f64 / 1000.0),
        is_optimal: rules.in_band(combined_salary),
    })
}

/// Ranking order: combined score desc, then correlation desc, then the
/// cheaper stack, then player ids for a total order.
pub fn compare_stacks(a: &Stack, b: &Stack) -> Ordering {
    b.combined_score
        .total_cmp(&a.combined_score)
        .then_with(|| b.correlation_score.total_cmp(&a.correlation_score))
        .then_with(|| a.combined_salary.cmp(&b.combined_salary))
        .then_with(|| a.quarterback.id().cmp(b.quarterback.id()))
        .then_with(|| a.pass_catcher.id().cmp(b.pass_catcher.id()))
}

#[derive(Default)]
struct TeamGroup<'a> {
    quarterbacks: Vec<&'a PlayerRef>,
    pass_catchers: Vec<&'a PlayerRef>,
}

pub struct StackFinder {
    config: OptimizerConfig,
}

impl StackFinder {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Every in-band stack, ranked by [`compare_stacks`].
    pub fn rank_stacks(&self, players: &[PlayerRef], metric: OptimizationMetric) -> Vec<Stack> {
        let rules = &self.config.stacks;

        let mut teams: BTreeMap<&str, TeamGroup> = BTreeMap::new();
        for player in players {
            let group = teams.entry(player.team.as_str()).or_default();
            match player.position {
                Position::QB => group.quarterbacks.push(player),
                Position::WR | Position::TE => group.pass_catchers.push(player),
                _ => {}
            }
        }

        let mut pairs = 0usize;
        let mut stacks: Vec<Stack> = Vec::new();
        for (team, group) in &teams {
            if group.quarterbacks.is_empty() || group.pass_catchers.is_empty() {
                debug!(team, "No QB or pass-catcher, team skipped");
                continue;
            }
            for qb in &group.quarterbacks {
                for catcher in &group.pass_catchers {
                    pairs += 1;
                    if let Some(stack) = make_stack(qb, catcher, metric, rules) {
                        if stack.is_optimal {
                            stacks.push(stack);
                        }
                    }
                }
            }
        }

        stacks.sort_by(compare_stacks);

        info!(
            teams = teams.len(),
            pairs,
            in_band = stacks.len(),
            band = format!("${}-${}", rules.min_salary, rules.max_salary),
            "Stack search complete"
        );

        stacks
    }

    /// The ranked stacks truncated to `max_candidates`.
    pub fn find_stacks(&self, players: &[PlayerRef], metric: OptimizationMetric) -> Vec<Stack> {
        let mut stacks = self.rank_stacks(players, metric);
        stacks.truncate(self.config.stacks.max_candidates);
        stacks
    }

    /// Pick seed stacks from the full ranking of [`rank_stacks`](Self::rank_stacks):
    /// the best `seeds_by_score` by combined score, then the best
    /// `seeds_by_value` by value ratio that are not already chosen. The
    /// value pick looks at every in-band stack, not only the score leaders.
    pub fn select_seeds(&self, ranked: &[Stack]) -> Vec<Stack> {
        let rules = &self.config.stacks;
        let mut seeds: Vec<Stack> = ranked.iter().take(rules.seeds_by_score).cloned().collect();

        let mut by_value: Vec<&Stack> = ranked.iter().collect();
        by_value.sort_by(|a, b| {
            b.value_ratio
                .total_cmp(&a.value_ratio)
                .then_with(|| compare_stacks(a, b))
        });

        let mut taken = 0usize;
        for stack in by_value {
            if taken == rules.seeds_by_value {
                break;
            }
            let key = stack.key();
            if seeds.iter().any(|s| s.key() == key) {
                continue;
            }
            seeds.push(stack.clone());
            taken += 1;
        }

        for (i, seed) in seeds.iter().enumerate() {
            info!(
                seed = i + 1,
                stack = %seed,
                value = format!("{:.2}", seed.value_ratio),
                "Seed stack selected"
            );
        }

        seeds
    }
}
