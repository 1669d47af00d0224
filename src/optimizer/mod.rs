//! Lineup optimizer: stack search, seeded lineup construction, validation,
//! quality scoring and final selection.

pub mod builder;
pub mod exposure;
pub mod quality;
pub mod scoring;
pub mod stacks;
pub mod validator;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OptimizerConfig;
use crate::types::{OptimizationMetric, PlayerRef, Stack, StackerError};
use builder::{variant_exclusions, BuildFailure, LineupBuilder, SearchProfile};
use exposure::{ExposureManager, PlayerExposure};
use quality::{QualityScorer, ScoredLineup};
use scoring::MetricResolution;
use stacks::StackFinder;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A candidate that never became a valid lineup, and every reason why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardRecord {
    /// Key of the seed stack.
    pub seed: String,
    /// Player ids excluded for this variant (empty for the base lineup).
    pub exclusions: Vec<String>,
    pub attempts: u32,
    pub reasons: Vec<String>,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub seeds_searched: usize,
    pub candidates_built: usize,
    pub candidates_discarded: usize,
    pub duplicates_dropped: usize,
    pub exposure_skipped: usize,
    pub nodes_explored: usize,
    pub elapsed_ms: u64,
    /// The wall-clock bound stopped the search early.
    pub bound_exhausted: bool,
}

/// Everything one optimization run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub metric: MetricResolution,
    pub pool_size: usize,
    /// In-band stacks the seeds were chosen from.
    pub stacks_considered: usize,
    pub seeds: Vec<Stack>,
    /// Ranked best first.
    pub lineups: Vec<ScoredLineup>,
    pub requested_lineups: usize,
    pub shortfall: usize,
    pub discarded: Vec<DiscardRecord>,
    pub exposures: Vec<PlayerExposure>,
    pub stats: SearchStats,
}

impl OptimizationReport {
    /// No lineup satisfied every constraint.
    pub fn is_infeasible(&self) -> bool {
        self.lineups.is_empty()
    }

    pub fn effective_metric(&self) -> OptimizationMetric {
        self.metric.effective
    }
}

// ---------------------------------------------------------------------------
// Per-seed search
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SeedResult {
    candidates: Vec<ScoredLineup>,
    discarded: Vec<DiscardRecord>,
    built: usize,
    duplicates: usize,
    nodes: usize,
    deadline_hit: bool,
}

/// Read-only context shared by every seed search of one run.
struct SeedSearch<'a> {
    config: &'a OptimizerConfig,
    builder: LineupBuilder,
    scorer: QualityScorer,
    deadline: Option<Instant>,
}

impl SeedSearch<'_> {
    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Base lineup for the seed, then variants until `lineups_per_seed`
    /// distinct lineups exist or the exclusion sets run out.
    fn run(&self, seed: &Stack, pool: &[PlayerRef]) -> SeedResult {
        let mut result = SeedResult::default();
        let Some(base) = self.candidate(seed, pool, &HashSet::new(), &mut result) else {
            return result;
        };

        let wanted = self.config.search.lineups_per_seed;
        let mut seen: HashSet<Vec<String>> = HashSet::from([base.lineup.player_key()]);
        let exclusions = variant_exclusions(&base.lineup, seed, usize::MAX);
        result.candidates.push(base);

        for excluded in exclusions {
            if result.candidates.len() >= wanted || result.deadline_hit {
                break;
            }
            if let Some(scored) = self.candidate(seed, pool, &excluded, &mut result) {
                if seen.insert(scored.lineup.player_key()) {
                    result.candidates.push(scored);
                } else {
                    result.duplicates += 1;
                }
            }
        }

        info!(
            seed = %seed.key(),
            lineups = result.candidates.len(),
            discarded = result.discarded.len(),
            nodes = result.nodes,
            "Seed searched"
        );
        result
    }

    /// Build, validate and score one candidate, retrying with a wider search
    /// and relaxed soft rules. Records a discard when every attempt fails.
    fn candidate(
        &self,
        seed: &Stack,
        pool: &[PlayerRef],
        excluded: &HashSet<String>,
        result: &mut SeedResult,
    ) -> Option<ScoredLineup> {
        let mut reasons: Vec<String> = Vec::new();
        let mut attempts = 0u32;

        for attempt in 0..=self.config.search.max_retries {
            if self.past_deadline() {
                result.deadline_hit = true;
                reasons.push(format!("attempt {attempt}: time limit reached"));
                break;
            }
            attempts += 1;
            let profile = SearchProfile::for_attempt(self.config, attempt);
            match self.builder.build(seed, pool, excluded, profile, self.deadline) {
                Ok(outcome) => {
                    result.nodes += outcome.nodes;
                    result.built += 1;
                    let violations = validator::validate(&outcome.lineup, &self.config.roster);
                    if violations.is_empty() {
                        return Some(self.scorer.score(outcome.lineup));
                    }
                    reasons.extend(violations.iter().map(|v| format!("attempt {attempt}: {v}")));
                }
                Err(failure) => {
                    result.nodes += failure.nodes();
                    reasons.push(format!("attempt {attempt}: {failure}"));
                    if failure.is_deadline() {
                        result.deadline_hit = true;
                        break;
                    }
                    if matches!(failure, BuildFailure::InvalidSeed(_)) {
                        break;
                    }
                }
            }
        }

        let mut exclusions: Vec<String> = excluded.iter().cloned().collect();
        exclusions.sort();
        debug!(
            seed = %seed.key(),
            excluded = ?exclusions,
            reason = reasons.last().map(String::as_str).unwrap_or("none"),
            "Candidate discarded"
        );
        result.discarded.push(DiscardRecord {
            seed: seed.key(),
            exclusions,
            attempts,
            reasons,
        });
        None
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Pipelines metric resolution → stack search → seeded builds → validation
/// → quality scoring → exposure selection.
///
/// The configuration is validated once at construction; `optimize` itself
/// never fails. Infeasible pools come back as an empty or short report with
/// the discard reasons attached.
pub struct LineupOptimizer {
    config: OptimizerConfig,
}

impl LineupOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self, StackerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run the full pipeline over a player pool.
    ///
    /// Steps:
    /// 1. Resolve the requested metric against the data (may fall back).
    /// 2. Rank stacks and pick the seeds.
    /// 3. Search every seed, in parallel when enabled, merging in seed order.
    /// 4. Select the final lineups by quality under the exposure rules.
    pub fn optimize(&self, players: &[PlayerRef]) -> OptimizationReport {
        let started = Instant::now();
        let deadline = self
            .config
            .search
            .time_limit_ms
            .map(|ms| started + Duration::from_millis(ms));

        // Step 1 – metric
        let metric = scoring::resolve_metric(self.config.metric, players);
        let effective = metric.effective;

        // Step 2 – stacks and seeds
        let finder = StackFinder::new(self.config.clone());
        let ranked = finder.rank_stacks(players, effective);
        let seeds = finder.select_seeds(&ranked);
        info!(
            pool = players.len(),
            stacks = ranked.len(),
            seeds = seeds.len(),
            metric = %effective,
            "Seed stacks chosen"
        );
        if seeds.is_empty() {
            warn!(
                min_salary = self.config.stacks.min_salary,
                max_salary = self.config.stacks.max_salary,
                "No QB stack fits the salary band"
            );
        }

        // Step 3 – seeded builds
        let search = SeedSearch {
            config: &self.config,
            builder: LineupBuilder::new(self.config.clone(), effective),
            scorer: QualityScorer::new(self.config.clone(), effective),
            deadline,
        };
        let results: Vec<SeedResult> = if self.config.search.parallel {
            seeds.par_iter().map(|seed| search.run(seed, players)).collect()
        } else {
            seeds.iter().map(|seed| search.run(seed, players)).collect()
        };

        let mut stats = SearchStats {
            seeds_searched: results.len(),
            ..SearchStats::default()
        };
        let mut candidates: Vec<ScoredLineup> = Vec::new();
        let mut discarded: Vec<DiscardRecord> = Vec::new();
        for result in results {
            stats.candidates_built += result.built;
            stats.nodes_explored += result.nodes;
            stats.duplicates_dropped += result.duplicates;
            stats.bound_exhausted |= result.deadline_hit;
            candidates.extend(result.candidates);
            discarded.extend(result.discarded);
        }
        stats.candidates_discarded = discarded.len();
        if stats.bound_exhausted {
            warn!(
                limit_ms = ?self.config.search.time_limit_ms,
                candidates = candidates.len(),
                "Time limit reached, keeping candidates found so far"
            );
        }

        // Step 4 – selection
        let selection = ExposureManager::new(self.config.clone()).select(candidates);
        stats.duplicates_dropped += selection.duplicates_dropped;
        stats.exposure_skipped = selection.exposure_skipped;
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        let best = selection
            .lineups
            .first()
            .map(|s| format!("{:.2}", s.quality_score))
            .unwrap_or_else(|| "-".to_string());
        info!(
            lineups = selection.lineups.len(),
            requested = self.config.target_lineups,
            shortfall = selection.shortfall,
            discarded = stats.candidates_discarded,
            best_quality = best,
            elapsed_ms = stats.elapsed_ms,
            "Optimization complete"
        );

        OptimizationReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            metric,
            pool_size: players.len(),
            stacks_considered: ranked.len(),
            seeds,
            lineups: selection.lineups,
            requested_lineups: self.config.target_lineups,
            shortfall: selection.shortfall,
            discarded,
            exposures: selection.exposures,
            stats,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
