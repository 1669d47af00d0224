//! Deterministic player pools for integration testing.
//!
//! `slate` is an eight-team main slate with full depth charts and bust/boom
//! distributions. `unique_combination_pool` is a 20-player pool priced so
//! that exactly one nine-player set fits the salary rules.

use std::collections::BTreeSet;

use stacker::config::RosterRules;
use stacker::data::{build_pool, PlayerRecord};
use stacker::types::{Lineup, PlayerRef, Position, Slot};

pub const TEAMS: [&str; 8] = ["KC", "BUF", "SF", "DAL", "PHI", "MIA", "DET", "CIN"];

/// "AWAY@HOME ..." for the game of team index `t` (pairs 0-1, 2-3, ...).
fn game_info(t: usize) -> String {
    let away = TEAMS[t & !1];
    let home = TEAMS[t | 1];
    format!("{away}@{home} 10/20/2024 01:00PM ET")
}

fn record(name: String, t: usize, position: &str, salary: u32, points: f64, boom_pct: f64) -> PlayerRecord {
    PlayerRecord {
        platform_id: Some(format!("{name} ({})", 10_000 + salary)),
        name: Some(name),
        team: Some(TEAMS[t].to_string()),
        game_info: Some(game_info(t)),
        position: Some(position.to_string()),
        salary: Some(salary as f64),
        projected_score: Some(points),
        bust_score: Some(points * 0.4),
        boom_score: Some(points * 1.8),
        bust_percentage: Some(20.0),
        boom_percentage: Some(boom_pct),
        ..PlayerRecord::default()
    }
}

/// Raw records for the eight-team slate; salaries and points rise with the
/// team index, boom percentage varies so the metrics disagree.
pub fn slate_records() -> Vec<PlayerRecord> {
    let mut records = Vec::new();
    for t in 0..TEAMS.len() {
        let (s, f) = (t as u32, t as f64);
        let team = TEAMS[t];
        let boom = 10.0 + ((t * 7) % 11) as f64;
        records.push(record(format!("{team} QB"), t, "QB", 5600 + s * 300, 17.0 + f * 0.8, boom));
        records.push(record(format!("{team} RB1"), t, "RB", 5000 + s * 400, 12.0 + f, boom + 2.0));
        records.push(record(format!("{team} RB2"), t, "RB", 4000 + s * 150, 8.0 + f * 0.5, boom));
        records.push(record(format!("{team} WR1"), t, "WR", 5200 + s * 450, 12.0 + f * 1.1, boom + 5.0));
        records.push(record(format!("{team} WR2"), t, "WR", 4200 + s * 200, 9.0 + f * 0.6, boom + 3.0));
        records.push(record(format!("{team} WR3"), t, "WR", 3200 + s * 100, 6.0 + f * 0.3, boom + 8.0));
        records.push(record(format!("{team} TE"), t, "TE", 3000 + s * 350, 6.0 + f * 0.9, boom + 1.0));
        records.push(record(format!("{team} D/ST"), t, "D/ST", 2200 + s * 150, 5.0 + f * 0.4, boom));
    }
    records
}

pub fn slate() -> Vec<PlayerRef> {
    let pool = build_pool(slate_records());
    assert!(pool.rejected.is_empty());
    pool.players
}

/// The slate with every bust/boom field blanked.
pub fn projections_only_slate() -> Vec<PlayerRef> {
    let records = slate_records()
        .into_iter()
        .map(|r| PlayerRecord {
            bust_score: None,
            boom_score: None,
            bust_percentage: None,
            boom_percentage: None,
            ..r
        })
        .collect();
    build_pool(records).players
}

fn plain(name: &str, team: &str, opponent: &str, position: &str, salary: u32, points: f64) -> PlayerRecord {
    PlayerRecord {
        name: Some(name.to_string()),
        team: Some(team.to_string()),
        opponent: Some(opponent.to_string()),
        position: Some(position.to_string()),
        salary: Some(salary as f64),
        projected_score: Some(points),
        ..PlayerRecord::default()
    }
}

/// Names of the nine players in the only legal lineup.
pub const CORE: [&str; 9] = [
    "Core QB", "Core WR1", "Core RB1", "Core RB2", "Core WR2", "Core WR3", "Core TE", "Core RB3",
    "Core DST",
];

/// 20 players: a nine-player core totalling $49,000 (five teams, at most two
/// per team) and eleven decoys each priced more than $1,000 above the most
/// expensive core player, so any lineup using a decoy breaks the $50,000 cap.
///
/// With `cheap_core` false the core's only sub-$4,000 skill player costs
/// $4,100 instead, and no legal lineup exists.
pub fn unique_combination_pool(cheap_core: bool) -> Vec<PlayerRef> {
    let wr3_salary = if cheap_core { 3800 } else { 4100 };
    let records = vec![
        plain("Core QB", "AAA", "BBB", "QB", 7000, 21.0),
        plain("Core WR1", "AAA", "BBB", "WR", 6500, 17.0),
        plain("Core RB1", "BBB", "AAA", "RB", 7200, 18.0),
        plain("Core RB2", "CCC", "DDD", "RB", 6300, 15.0),
        plain("Core WR2", "BBB", "AAA", "WR", 6000, 14.0),
        plain("Core WR3", "DDD", "CCC", "WR", wr3_salary, 9.0),
        plain("Core TE", "CCC", "DDD", "TE", 4500, 10.0),
        plain("Core RB3", "DDD", "CCC", "RB", 4700, 11.0),
        plain("Core DST", "EEE", "FFF", "DST", 3000, 8.0),
        plain("Decoy QB", "BBB", "AAA", "QB", 8300, 12.0),
        plain("Decoy RB1", "AAA", "BBB", "RB", 8400, 9.0),
        plain("Decoy RB2", "EEE", "FFF", "RB", 8500, 9.0),
        plain("Decoy RB3", "FFF", "EEE", "RB", 8800, 9.5),
        plain("Decoy WR1", "CCC", "DDD", "WR", 8600, 8.0),
        plain("Decoy WR2", "EEE", "FFF", "WR", 8300, 8.5),
        plain("Decoy WR3", "FFF", "EEE", "WR", 8700, 7.0),
        plain("Decoy TE1", "AAA", "BBB", "TE", 8300, 6.0),
        plain("Decoy TE2", "DDD", "CCC", "TE", 8400, 6.5),
        plain("Decoy DST1", "FFF", "EEE", "DST", 8300, 4.0),
        plain("Decoy DST2", "BBB", "AAA", "DST", 8350, 4.0),
    ];
    let pool = build_pool(records);
    assert_eq!(pool.players.len(), 20);
    pool.players
}

/// Check every hard lineup rule directly, without the crate's validator.
pub fn assert_lineup_legal(lineup: &Lineup, rules: &RosterRules) {
    let players: Vec<&PlayerRef> = lineup.players().collect();
    assert_eq!(players.len(), 9);

    let ids: BTreeSet<&str> = players.iter().map(|p| p.id()).collect();
    assert_eq!(ids.len(), 9, "repeated player in {lineup}");

    for (slot, player) in lineup.assignments() {
        let ok = match slot {
            Slot::Qb => player.position == Position::QB,
            Slot::Rb1 | Slot::Rb2 => player.position == Position::RB,
            Slot::Wr1 | Slot::Wr2 | Slot::Wr3 => player.position == Position::WR,
            Slot::Te => player.position == Position::TE,
            Slot::Flex => matches!(player.position, Position::RB | Position::WR | Position::TE),
            Slot::Dst => player.position == Position::DST,
        };
        assert!(ok, "{} cannot play {slot}", player.name);
    }

    let salary: u32 = players.iter().map(|p| p.salary).sum();
    assert_eq!(salary, lineup.total_salary);
    assert!(salary <= rules.salary_cap, "over cap: {salary}");
    assert!(
        salary as f64 >= rules.salary_cap as f64 * rules.min_salary_utilization - 1e-6,
        "under floor: {salary}"
    );

    assert!(
        players
            .iter()
            .any(|p| p.position != Position::DST && p.salary <= rules.cheap_player_salary),
        "no cheap player in {lineup}"
    );

    let mut teams = std::collections::BTreeMap::new();
    for p in &players {
        *teams.entry(p.team.as_str()).or_insert(0usize) += 1;
    }
    assert!(teams.values().all(|c| *c <= rules.max_players_per_team));
    assert!(teams.len() >= rules.min_distinct_teams);
}
