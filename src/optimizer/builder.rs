//! Lineup builder.
//!
//! Fills the open roster slots around a seed stack with a bounded
//! greedy-with-backtrack search. Slots are filled most-constrained-first
//! (DST, TE, then RB, WR, FLEX). For each slot the eligible players are
//! ranked by metric per salary dollar and the first few that keep the
//! remaining budget feasible are tried in order; a dead end backtracks one
//! slot. The search is a heuristic: it returns the first feasible roster it
//! reaches, not the global optimum, and gives up after a node budget.
//!
//! A feasible roster then goes through a salary-upgrade pass that spends
//! leftover cap on higher-metric players while every hard rule still holds.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{OptimizerConfig, RosterRules};
use crate::types::{Lineup, OptimizationMetric, PlayerRef, Position, Slot, Stack};

/// Open-slot fill order: most constrained first.
const FILL_ORDER: [Slot; 8] = [
    Slot::Dst,
    Slot::Te,
    Slot::Rb1,
    Slot::Rb2,
    Slot::Wr1,
    Slot::Wr2,
    Slot::Wr3,
    Slot::Flex,
];

/// How often the deadline is polled, in search nodes.
const DEADLINE_POLL: usize = 64;

/// Minimum metric gain for an upgrade swap.
const UPGRADE_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Search profile and outcomes
// ---------------------------------------------------------------------------

/// Settings that change between build attempts for the same request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchProfile {
    pub attempt: u32,
    pub candidate_width: usize,
    pub avoid_opposing_dst: bool,
}

impl SearchProfile {
    /// Attempt 0 uses the configured width and soft rules; each retry widens
    /// the candidate list and drops the opposing-DST preference.
    pub fn for_attempt(config: &OptimizerConfig, attempt: u32) -> Self {
        Self {
            attempt,
            candidate_width: config
                .search
                .candidate_width
                .saturating_mul(attempt as usize + 1),
            avoid_opposing_dst: config.stacks.avoid_opposing_dst && attempt == 0,
        }
    }
}

/// Why a build produced no lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildFailure {
    /// The seed itself cannot start a legal lineup.
    InvalidSeed(String),
    /// No eligible player exists for a slot.
    NoCandidates { slot: Slot },
    /// Every ranked branch was tried without reaching a feasible roster.
    Exhausted { nodes: usize },
    /// The per-build node budget ran out.
    NodeLimit { nodes: usize },
    /// The run's wall-clock bound passed mid-search.
    DeadlineReached { nodes: usize },
}

impl BuildFailure {
    pub fn nodes(&self) -> usize {
        match self {
            BuildFailure::Exhausted { nodes }
            | BuildFailure::NodeLimit { nodes }
            | BuildFailure::DeadlineReached { nodes } => *nodes,
            _ => 0,
        }
    }

    pub fn is_deadline(&self) -> bool {
        matches!(self, BuildFailure::DeadlineReached { .. })
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildFailure::InvalidSeed(why) => write!(f, "invalid seed stack: {why}"),
            BuildFailure::NoCandidates { slot } => write!(f, "no eligible players for {slot}"),
            BuildFailure::Exhausted { nodes } => {
                write!(f, "search exhausted after {nodes} nodes without a feasible roster")
            }
            BuildFailure::NodeLimit { nodes } => write!(f, "node budget of {nodes} exhausted"),
            BuildFailure::DeadlineReached { nodes } => {
                write!(f, "time limit reached after {nodes} nodes")
            }
        }
    }
}

/// A built (not yet validated) lineup.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub lineup: Lineup,
    pub nodes: usize,
    pub upgrades: usize,
}

// ---------------------------------------------------------------------------
// Working roster
// ---------------------------------------------------------------------------

/// Private mutable state of one build.
struct Roster<'a> {
    slots: [Option<&'a PlayerRef>; Slot::COUNT],
    used: HashSet<&'a str>,
    team_counts: HashMap<&'a str, usize>,
    salary: u32,
    cheap_count: usize,
    cheap_floor: u32,
}

impl<'a> Roster<'a> {
    fn new(cheap_floor: u32) -> Self {
        Self {
            slots: [None; Slot::COUNT],
            used: HashSet::new(),
            team_counts: HashMap::new(),
            salary: 0,
            cheap_count: 0,
            cheap_floor,
        }
    }

    fn place(&mut self, slot: Slot, player: &'a PlayerRef) {
        self.slots[slot.index()] = Some(player);
        self.used.insert(player.id());
        *self.team_counts.entry(player.team.as_str()).or_insert(0) += 1;
        self.salary += player.salary;
        if player.is_cheap(self.cheap_floor) {
            self.cheap_count += 1;
        }
    }

    fn remove(&mut self, slot: Slot) {
        let Some(player) = self.slots[slot.index()].take() else {
            return;
        };
        self.used.remove(player.id());
        if let Some(count) = self.team_counts.get_mut(player.team.as_str()) {
            *count -= 1;
            if *count == 0 {
                self.team_counts.remove(player.team.as_str());
            }
        }
        self.salary -= player.salary;
        if player.is_cheap(self.cheap_floor) {
            self.cheap_count -= 1;
        }
    }

    fn team_count(&self, team: &str) -> usize {
        self.team_counts.get(team).copied().unwrap_or(0)
    }

    fn distinct_teams(&self) -> usize {
        self.team_counts.len()
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

struct Search<'a> {
    rules: &'a RosterRules,
    metric: OptimizationMetric,
    profile: SearchProfile,
    floor: u32,
    open: Vec<Slot>,
    /// Ranked eligible players per open slot.
    candidates: Vec<Vec<&'a PlayerRef>>,
    /// `min_rest[k]`: cheapest possible spend on open slots `k..`.
    min_rest: Vec<u32>,
    /// `max_rest[k]`: most expensive possible spend on open slots `k..`.
    max_rest: Vec<u32>,
    /// `cheap_loss[k]`: smallest reduction of `max_rest[k]` when one of the
    /// slots `k..` must hold a cheap player; `None` if none can.
    cheap_loss: Vec<Option<u32>>,
    nodes: usize,
    max_nodes: usize,
    deadline: Option<Instant>,
}

impl<'a> Search<'a> {
    fn tick(&mut self) -> Result<(), BuildFailure> {
        self.nodes += 1;
        if self.nodes > self.max_nodes {
            return Err(BuildFailure::NodeLimit { nodes: self.nodes });
        }
        if self.nodes % DEADLINE_POLL == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(BuildFailure::DeadlineReached { nodes: self.nodes });
                }
            }
        }
        Ok(())
    }

    fn descend(&mut self, depth: usize, roster: &mut Roster<'a>) -> Result<bool, BuildFailure> {
        if depth == self.open.len() {
            return Ok(roster.cheap_count > 0
                && roster.distinct_teams() >= self.rules.min_distinct_teams
                && roster.salary >= self.floor
                && roster.salary <= self.rules.salary_cap);
        }

        let remaining = self.open.len() - depth;
        if roster.distinct_teams() + remaining < self.rules.min_distinct_teams {
            return Ok(false);
        }

        let slot = self.open[depth];
        let spent = roster.salary as i64;
        let upper = self.rules.salary_cap as i64 - spent - self.min_rest[depth + 1] as i64;
        let lower_open = self.floor as i64 - spent - self.max_rest[depth + 1] as i64;
        // When no cheap player is placed yet and this pick is not cheap, one
        // later slot must take a cheap player, which caps what is left to spend.
        let lower_reserved = if roster.cheap_count == 0 {
            self.cheap_loss[depth + 1].map(|loss| lower_open + loss as i64)
        } else {
            Some(lower_open)
        };

        let mut tried = 0usize;
        for idx in 0..self.candidates[depth].len() {
            if tried >= self.profile.candidate_width {
                break;
            }
            let player = self.candidates[depth][idx];
            if roster.used.contains(player.id()) {
                continue;
            }
            if roster.team_count(&player.team) >= self.rules.max_players_per_team {
                continue;
            }
            let salary = player.salary as i64;
            let lower = if player.is_cheap(self.rules.cheap_player_salary) {
                lower_open
            } else {
                match lower_reserved {
                    Some(lower) => lower,
                    None => continue,
                }
            };
            if salary > upper || salary < lower {
                continue;
            }

            tried += 1;
            self.tick()?;
            roster.place(slot, player);
            if self.descend(depth + 1, roster)? {
                return Ok(true);
            }
            roster.remove(slot);
        }

        Ok(false)
    }

    /// Would replacing `current` with `candidate` keep every hard rule?
    fn swap_is_legal(&self, roster: &Roster<'a>, current: &PlayerRef, candidate: &PlayerRef) -> bool {
        let salary = roster.salary - current.salary + candidate.salary;
        if salary > self.rules.salary_cap || salary < self.floor {
            return false;
        }

        let floor = self.rules.cheap_player_salary;
        let cheap = roster.cheap_count - usize::from(current.is_cheap(floor))
            + usize::from(candidate.is_cheap(floor));
        if cheap == 0 {
            return false;
        }

        if candidate.team != current.team {
            if roster.team_count(&candidate.team) >= self.rules.max_players_per_team {
                return false;
            }
            let mut teams = roster.distinct_teams();
            if roster.team_count(&current.team) == 1 {
                teams -= 1;
            }
            if roster.team_count(&candidate.team) == 0 {
                teams += 1;
            }
            if teams < self.rules.min_distinct_teams {
                return false;
            }
        }

        true
    }

    /// Spend leftover cap: each pass applies the single best metric-raising swap.
    fn upgrade(&self, roster: &mut Roster<'a>, passes: usize) -> usize {
        let mut applied = 0usize;
        for _ in 0..passes {
            let mut best: Option<(Slot, &'a PlayerRef, f64)> = None;
            for (k, &slot) in self.open.iter().enumerate() {
                let Some(current) = roster.slots[slot.index()] else {
                    continue;
                };
                for &candidate in &self.candidates[k] {
                    if roster.used.contains(candidate.id()) {
                        continue;
                    }
                    let gain = candidate.metric(self.metric) - current.metric(self.metric);
                    if gain <= UPGRADE_EPSILON {
                        continue;
                    }
                    if best.map_or(false, |(_, _, g)| gain <= g) {
                        continue;
                    }
                    if self.swap_is_legal(roster, current, candidate) {
                        best = Some((slot, candidate, gain));
                    }
                }
            }

            match best {
                Some((slot, candidate, gain)) => {
                    debug!(slot = %slot, player = %candidate.name, gain, "Salary upgrade");
                    roster.remove(slot);
                    roster.place(slot, candidate);
                    applied += 1;
                }
                None => break,
            }
        }
        applied
    }
}

fn efficiency(player: &PlayerRef, metric: OptimizationMetric) -> f64 {
    player.metric(metric) / player.salary as f64
}

/// Value-efficiency ranking: metric per dollar, then raw metric, then id.
fn rank_by_efficiency(a: &PlayerRef, b: &PlayerRef, metric: OptimizationMetric) -> Ordering {
    efficiency(b, metric)
        .total_cmp(&efficiency(a, metric))
        .then_with(|| b.metric(metric).total_cmp(&a.metric(metric)))
        .then_with(|| a.id().cmp(b.id()))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct LineupBuilder {
    config: OptimizerConfig,
    metric: OptimizationMetric,
}

impl LineupBuilder {
    pub fn new(config: OptimizerConfig, metric: OptimizationMetric) -> Self {
        Self { config, metric }
    }

    /// Build one lineup around `seed` from `pool`, never using a player whose
    /// id is in `excluded`.
    pub fn build(
        &self,
        seed: &Stack,
        pool: &[PlayerRef],
        excluded: &HashSet<String>,
        profile: SearchProfile,
        deadline: Option<Instant>,
    ) -> Result<BuildOutcome, BuildFailure> {
        let rules = &self.config.roster;
        let catcher_slot = check_seed(seed, rules)?;

        let mut roster = Roster::new(rules.cheap_player_salary);
        roster.place(Slot::Qb, &seed.quarterback);
        roster.place(catcher_slot, &seed.pass_catcher);

        let open: Vec<Slot> = FILL_ORDER
            .iter()
            .copied()
            .filter(|slot| *slot != catcher_slot)
            .collect();

        let opposing = seed.quarterback.opponent.as_str();
        let mut candidates: Vec<Vec<&PlayerRef>> = Vec::with_capacity(open.len());
        for &slot in &open {
            let mut eligible: Vec<&PlayerRef> = pool
                .iter()
                .filter(|p| slot.accepts(p.position) && p.salary <= rules.salary_cap)
                .filter(|p| !seed.contains(p.id()) && !excluded.contains(p.id()))
                .filter(|p| {
                    !(slot == Slot::Dst
                        && profile.avoid_opposing_dst
                        && !opposing.is_empty()
                        && p.team == opposing)
                })
                .collect();
            if eligible.is_empty() {
                return Err(BuildFailure::NoCandidates { slot });
            }
            eligible.sort_by(|a, b| rank_by_efficiency(a, b, self.metric));
            candidates.push(eligible);
        }

        let n = open.len();
        let mut min_rest = vec![0u32; n + 1];
        let mut max_rest = vec![0u32; n + 1];
        let mut cheap_loss: Vec<Option<u32>> = vec![None; n + 1];
        for k in (0..n).rev() {
            let salaries = candidates[k].iter().map(|p| p.salary);
            let min = salaries.clone().min().unwrap_or(0);
            let max = salaries.max().unwrap_or(0);
            let max_cheap = candidates[k]
                .iter()
                .filter(|p| p.is_cheap(rules.cheap_player_salary))
                .map(|p| p.salary)
                .max();
            let loss = max_cheap.map(|cheap| max - cheap);
            min_rest[k] = min_rest[k + 1].saturating_add(min);
            max_rest[k] = max_rest[k + 1].saturating_add(max);
            cheap_loss[k] = match (loss, cheap_loss[k + 1]) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }

        let mut search = Search {
            rules,
            metric: self.metric,
            profile,
            floor: rules.utilization_floor(),
            open,
            candidates,
            min_rest,
            max_rest,
            cheap_loss,
            nodes: 0,
            max_nodes: self.config.search.max_nodes_per_build,
            deadline,
        };

        if !search.descend(0, &mut roster)? {
            debug!(
                seed = %seed.key(),
                nodes = search.nodes,
                attempt = profile.attempt,
                "Seed search exhausted"
            );
            return Err(BuildFailure::Exhausted {
                nodes: search.nodes,
            });
        }

        let upgrades = search.upgrade(&mut roster, self.config.search.upgrade_passes);

        let mut filled: Vec<PlayerRef> = Vec::with_capacity(Slot::COUNT);
        for slot in Slot::ALL {
            match roster.slots[slot.index()] {
                Some(player) => filled.push(Arc::clone(player)),
                None => {
                    return Err(BuildFailure::Exhausted {
                        nodes: search.nodes,
                    })
                }
            }
        }
        let slots: [PlayerRef; Slot::COUNT] = filled.try_into().map_err(|_| {
            BuildFailure::Exhausted {
                nodes: search.nodes,
            }
        })?;

        let lineup = Lineup::from_slots(slots, seed.key());
        debug!(
            seed = %seed.key(),
            nodes = search.nodes,
            upgrades,
            salary = lineup.total_salary,
            points = format!("{:.2}", lineup.metric_total(self.metric)),
            "Lineup built"
        );

        Ok(BuildOutcome {
            lineup,
            nodes: search.nodes,
            upgrades,
        })
    }
}

/// Where the seed's pass-catcher sits, or why the seed is unusable.
fn check_seed(seed: &Stack, rules: &RosterRules) -> Result<Slot, BuildFailure> {
    if seed.quarterback.position != Position::QB {
        return Err(BuildFailure::InvalidSeed(format!(
            "{} is not a quarterback",
            seed.quarterback.name
        )));
    }
    if seed.quarterback.team != seed.pass_catcher.team {
        return Err(BuildFailure::InvalidSeed("stack players are on different teams".into()));
    }
    if seed.quarterback.id() == seed.pass_catcher.id() {
        return Err(BuildFailure::InvalidSeed("stack repeats one player".into()));
    }
    if rules.max_players_per_team < 2 {
        return Err(BuildFailure::InvalidSeed(
            "per-team cap leaves no room for a stack".into(),
        ));
    }
    if seed.combined_salary > rules.salary_cap {
        return Err(BuildFailure::InvalidSeed(format!(
            "stack salary ${} exceeds the cap",
            seed.combined_salary
        )));
    }
    match seed.pass_catcher.position {
        Position::WR => Ok(Slot::Wr1),
        Position::TE => Ok(Slot::Te),
        other => Err(BuildFailure::InvalidSeed(format!(
            "{other} cannot complete a stack"
        ))),
    }
}

/// Exclusion sets used to draw further lineups from one seed: first each
/// non-stack player of the base lineup alone, then every pair of them, in
/// roster order. At most `limit` sets.
pub fn variant_exclusions(base: &Lineup, seed: &Stack, limit: usize) -> Vec<HashSet<String>> {
    let ids: Vec<String> = base
        .players()
        .filter(|p| !seed.contains(p.id()))
        .map(|p| p.id().to_string())
        .collect();

    let mut sets: Vec<HashSet<String>> = Vec::new();
    for id in &ids {
        if sets.len() >= limit {
            return sets;
        }
        sets.push(HashSet::from([id.clone()]));
    }
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if sets.len() >= limit {
                return sets;
            }
            sets.push(HashSet::from([ids[i].clone(), ids[j].clone()]));
        }
    }
    sets
}
