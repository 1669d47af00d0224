//! Exposure and diversity manager.
//!
//! Picks the final ranked lineups out of every scored candidate: best
//! quality first, exact duplicates dropped, and (when configured) no player
//! in more than `max_exposure` of the output. Never pads the output with
//! invalid lineups; a short pool is reported as a shortfall.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OptimizerConfig;
use crate::optimizer::quality::ScoredLineup;

/// How often one player appears in the selected lineups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerExposure {
    pub player: String,
    pub count: usize,
    pub fraction: f64,
}

/// Outcome of the selection pass.
#[derive(Debug, Clone)]
pub struct Selection {
    pub lineups: Vec<ScoredLineup>,
    pub duplicates_dropped: usize,
    pub exposure_skipped: usize,
    /// Lineups missing from the requested count.
    pub shortfall: usize,
    pub exposures: Vec<PlayerExposure>,
}

pub struct ExposureManager {
    config: OptimizerConfig,
}

impl ExposureManager {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Most lineups any one player may appear in, if capped.
    pub fn appearance_limit(&self) -> Option<usize> {
        self.config.exposure.max_exposure.map(|max| {
            let limit = (max * self.config.target_lineups as f64 + 1e-9).floor() as usize;
            limit.max(1)
        })
    }

    /// Ranking: quality descending, then the smaller gap to the cap, then
    /// the sorted player set so equal candidates order the same every run.
    fn rank(&self, a: &ScoredLineup, b: &ScoredLineup) -> Ordering {
        let cap = self.config.roster.salary_cap;
        let gap = |s: &ScoredLineup| cap.abs_diff(s.lineup.total_salary);
        b.quality_score
            .total_cmp(&a.quality_score)
            .then_with(|| gap(a).cmp(&gap(b)))
            .then_with(|| a.lineup.player_key().cmp(&b.lineup.player_key()))
    }

    pub fn select(&self, mut candidates: Vec<ScoredLineup>) -> Selection {
        let target = self.config.target_lineups;
        let limit = self.appearance_limit();
        candidates.sort_by(|a, b| self.rank(a, b));

        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut lineups: Vec<ScoredLineup> = Vec::with_capacity(target);
        let mut duplicates_dropped = 0usize;
        let mut exposure_skipped = 0usize;

        for candidate in candidates {
            if lineups.len() >= target {
                break;
            }
            let key = candidate.lineup.player_key();
            if seen.contains(&key) {
                duplicates_dropped += 1;
                continue;
            }
            if let Some(limit) = limit {
                let blocked = key
                    .iter()
                    .any(|id| counts.get(id).copied().unwrap_or(0) >= limit);
                if blocked {
                    exposure_skipped += 1;
                    continue;
                }
            }
            for id in &key {
                *counts.entry(id.clone()).or_insert(0) += 1;
            }
            seen.insert(key);
            lineups.push(candidate);
        }

        let shortfall = target.saturating_sub(lineups.len());
        if shortfall > 0 {
            warn!(
                requested = target,
                selected = lineups.len(),
                shortfall,
                "Fewer valid lineups than requested"
            );
        }
        debug!(
            selected = lineups.len(),
            duplicates_dropped,
            exposure_skipped,
            "Exposure selection complete"
        );

        let exposures = exposure_table(&lineups);
        Selection {
            lineups,
            duplicates_dropped,
            exposure_skipped,
            shortfall,
            exposures,
        }
    }
}

/// Per-player appearance counts, most exposed first.
pub fn exposure_table(lineups: &[ScoredLineup]) -> Vec<PlayerExposure> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for scored in lineups {
        for player in scored.lineup.players() {
            *counts.entry(player.id()).or_insert(0) += 1;
        }
    }
    let total = lineups.len().max(1) as f64;
    let mut table: Vec<PlayerExposure> = counts
        .into_iter()
        .map(|(player, count)| PlayerExposure {
            player: player.to_string(),
            count,
            fraction: count as f64 / total,
        })
        .collect();
    table.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.player.cmp(&b.player)));
    table
}
