//! Lineup validator.
//!
//! Re-checks every hard roster rule on a finished lineup, independent of how
//! the builder got there. The builder should never produce a violating
//! lineup; anything that does is discarded by the optimizer.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RosterRules;
use crate::types::{Lineup, Position, Slot};

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Violation {
    SlotMismatch { slot: Slot, position: Position },
    DuplicatePlayer(String),
    OverCap { total: u32, cap: u32 },
    UnderUtilized { total: u32, floor: u32 },
    NoCheapPlayer { floor: u32 },
    TeamOverLimit { team: String, count: usize, limit: usize },
    TooFewTeams { teams: usize, minimum: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::SlotMismatch { slot, position } => {
                write!(f, "{position} cannot fill the {slot} slot")
            }
            Violation::DuplicatePlayer(id) => write!(f, "{id} appears more than once"),
            Violation::OverCap { total, cap } => {
                write!(f, "salary ${total} exceeds the ${cap} cap")
            }
            Violation::UnderUtilized { total, floor } => {
                write!(f, "salary ${total} is below the ${floor} floor")
            }
            Violation::NoCheapPlayer { floor } => {
                write!(f, "no non-DST player priced at or below ${floor}")
            }
            Violation::TeamOverLimit { team, count, limit } => {
                write!(f, "{count} players from {team} (limit {limit})")
            }
            Violation::TooFewTeams { teams, minimum } => {
                write!(f, "{teams} distinct teams (minimum {minimum})")
            }
        }
    }
}

/// All rules the lineup breaks. Empty means valid.
pub fn validate(lineup: &Lineup, rules: &RosterRules) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (slot, player) in lineup.assignments() {
        if !slot.accepts(player.position) {
            violations.push(Violation::SlotMismatch {
                slot,
                position: player.position,
            });
        }
    }

    let mut seen = HashSet::new();
    for player in lineup.players() {
        if !seen.insert(player.id()) {
            violations.push(Violation::DuplicatePlayer(player.id().to_string()));
        }
    }

    let total = lineup.total_salary;
    if total > rules.salary_cap {
        violations.push(Violation::OverCap {
            total,
            cap: rules.salary_cap,
        });
    }
    let floor = rules.utilization_floor();
    if total < floor {
        violations.push(Violation::UnderUtilized { total, floor });
    }

    if !lineup
        .players()
        .any(|p| p.is_cheap(rules.cheap_player_salary))
    {
        violations.push(Violation::NoCheapPlayer {
            floor: rules.cheap_player_salary,
        });
    }

    let counts = lineup.team_counts();
    for (team, count) in &counts {
        if *count > rules.max_players_per_team {
            violations.push(Violation::TeamOverLimit {
                team: team.to_string(),
                count: *count,
                limit: rules.max_players_per_team,
            });
        }
    }
    if counts.len() < rules.min_distinct_teams {
        violations.push(Violation::TooFewTeams {
            teams: counts.len(),
            minimum: rules.min_distinct_teams,
        });
    }

    violations
}
