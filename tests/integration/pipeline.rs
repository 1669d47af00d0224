//! End-to-end optimizer runs over the fixture pools.

use std::collections::{BTreeSet, HashMap, HashSet};

use stacker::config::{AppConfig, OptimizerConfig};
use stacker::data::load_merged_pool;
use stacker::data::merge::{ProjectionRow, SalaryRow};
use stacker::optimizer::stacks::StackFinder;
use stacker::optimizer::{LineupOptimizer, OptimizationReport};
use stacker::storage;
use stacker::types::{OptimizationMetric, PlayerRef, Position, Slot};

use super::fixtures::{
    assert_lineup_legal, projections_only_slate, slate, unique_combination_pool, CORE,
};

// ---- helpers ---------------------------------------------------------------

fn make_config(metric: OptimizationMetric, target: usize) -> OptimizerConfig {
    let mut cfg = OptimizerConfig::default();
    cfg.metric = metric;
    cfg.target_lineups = target;
    cfg.search.lineups_per_seed = 8;
    cfg
}

fn run(cfg: OptimizerConfig, pool: &[PlayerRef]) -> OptimizationReport {
    LineupOptimizer::new(cfg).unwrap().optimize(pool)
}

fn lineup_keys(report: &OptimizationReport) -> Vec<Vec<String>> {
    report
        .lineups
        .iter()
        .map(|s| s.lineup.player_key())
        .collect()
}

fn temp_path(ext: &str) -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("stacker_it_{}.{ext}", uuid::Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

// ---- constraint properties -------------------------------------------------

#[test]
fn test_every_output_lineup_is_legal_and_unique() {
    let pool = slate();
    for metric in [
        OptimizationMetric::Projected,
        OptimizationMetric::RiskAdjusted,
        OptimizationMetric::BoomScore,
    ] {
        let cfg = make_config(metric, 12);
        let report = run(cfg.clone(), &pool);

        assert!(!report.lineups.is_empty(), "no lineups for {metric}");
        assert!(!report.metric.is_fallback());
        assert!(report.lineups.len() <= 12);
        assert_eq!(report.lineups.len() + report.shortfall, 12);

        let mut seen = HashSet::new();
        for scored in &report.lineups {
            assert_lineup_legal(&scored.lineup, &cfg.roster);
            assert!(seen.insert(scored.lineup.player_key()), "duplicate lineup");
        }
        for pair in report.lineups.windows(2) {
            assert!(pair[0].quality_score >= pair[1].quality_score);
        }
    }
}

#[test]
fn test_each_lineup_contains_its_seed_stack() {
    let report = run(make_config(OptimizationMetric::Projected, 10), &slate());
    let seeds: HashMap<String, _> = report.seeds.iter().map(|s| (s.key(), s)).collect();
    for scored in &report.lineups {
        let seed = seeds.get(&scored.lineup.seed).expect("lineup seed is a chosen stack");
        assert_eq!(scored.lineup.player(Slot::Qb).id(), seed.quarterback.id());
        assert!(scored.lineup.contains(seed.pass_catcher.id()));
    }
}

#[test]
fn test_seeds_mix_score_and_value() {
    let pool = slate();
    let cfg = make_config(OptimizationMetric::Projected, 10);
    let report = run(cfg.clone(), &pool);

    assert_eq!(report.seeds.len(), 4);
    let keys: BTreeSet<String> = report.seeds.iter().map(|s| s.key()).collect();
    assert_eq!(keys.len(), 4);
    let in_band = StackFinder::new(cfg.clone()).rank_stacks(&pool, OptimizationMetric::Projected);
    assert_eq!(report.stacks_considered, in_band.len());
    let best_value = in_band
        .iter()
        .max_by(|a, b| a.value_ratio.total_cmp(&b.value_ratio))
        .unwrap();
    assert!(keys.contains(&best_value.key()));

    for seed in &report.seeds {
        assert!(cfg.stacks.in_band(seed.combined_salary));
        assert_eq!(seed.quarterback.team, seed.pass_catcher.team);
        assert!(seed.pass_catcher.position.is_pass_catcher());
    }
}

#[test]
fn test_exposure_cap_respected() {
    let mut cfg = make_config(OptimizationMetric::Projected, 8);
    cfg.exposure.max_exposure = Some(0.5);
    let report = run(cfg, &slate());

    let mut counts: HashMap<String, usize> = HashMap::new();
    for scored in &report.lineups {
        for p in scored.lineup.players() {
            *counts.entry(p.id().to_string()).or_insert(0) += 1;
        }
    }
    assert!(counts.values().all(|c| *c <= 4));
    assert!(report.exposures.iter().all(|e| e.count <= 4));
}

// ---- determinism -----------------------------------------------------------

#[test]
fn test_stack_ranking_is_deterministic() {
    let pool = slate();
    let finder = StackFinder::new(OptimizerConfig::default());
    let first: Vec<String> = finder
        .find_stacks(&pool, OptimizationMetric::Projected)
        .iter()
        .map(|s| s.key())
        .collect();

    let mut reversed = pool.clone();
    reversed.reverse();
    let second: Vec<String> = finder
        .find_stacks(&reversed, OptimizationMetric::Projected)
        .iter()
        .map(|s| s.key())
        .collect();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_repeated_runs_match() {
    let pool = slate();
    let a = run(make_config(OptimizationMetric::RiskAdjusted, 10), &pool);
    let b = run(make_config(OptimizationMetric::RiskAdjusted, 10), &pool);
    assert_eq!(lineup_keys(&a), lineup_keys(&b));
    assert_ne!(a.run_id, b.run_id);
}

// ---- scoring fallback ------------------------------------------------------

#[test]
fn test_projection_only_pool_degrades_scoring() {
    let pool = projections_only_slate();
    for p in &pool {
        assert_eq!(p.risk_adjusted_score, p.projected_score());
        assert_eq!(p.upside_potential, 0.0);
    }
}

#[test]
fn test_boom_metric_without_data_falls_back_and_reports() {
    let report = run(make_config(OptimizationMetric::BoomScore, 6), &projections_only_slate());
    assert!(report.metric.is_fallback());
    assert_eq!(report.metric.requested, OptimizationMetric::BoomScore);
    assert_eq!(report.effective_metric(), OptimizationMetric::Projected);
    assert!(report.metric.fallback_reason.is_some());
    assert!(!report.lineups.is_empty());
}

// ---- unique-combination scenario ------------------------------------------

#[test]
fn test_finds_the_only_legal_lineup() {
    let pool = unique_combination_pool(true);
    let cfg = make_config(OptimizationMetric::Projected, 5);
    let report = run(cfg.clone(), &pool);

    assert_eq!(report.lineups.len(), 1);
    assert_eq!(report.shortfall, 4);

    let lineup = &report.lineups[0].lineup;
    assert_lineup_legal(lineup, &cfg.roster);
    assert_eq!(lineup.total_salary, 49_000);
    let names: BTreeSet<&str> = lineup.players().map(|p| p.name.as_str()).collect();
    let expected: BTreeSet<&str> = CORE.iter().copied().collect();
    assert_eq!(names, expected);
}

#[test]
fn test_cheap_floor_makes_pool_infeasible() {
    let pool = unique_combination_pool(false);
    let cfg = make_config(OptimizationMetric::Projected, 5);
    let report = run(cfg, &pool);

    assert!(report.is_infeasible());
    assert_eq!(report.shortfall, 5);
    assert!(!report.discarded.is_empty());
    assert!(report.discarded.iter().all(|d| !d.reasons.is_empty()));
}

#[test]
fn test_unreachable_stack_band_is_reported_not_fatal() {
    let mut cfg = make_config(OptimizationMetric::Projected, 5);
    cfg.stacks.min_salary = 30_000;
    cfg.stacks.max_salary = 40_000;
    let report = run(cfg, &slate());
    assert_eq!(report.stacks_considered, 0);
    assert!(report.is_infeasible());
    assert_eq!(report.shortfall, 5);
}

// ---- input and output ------------------------------------------------------

#[test]
fn test_merged_sources_feed_the_optimizer() {
    let pool = slate();
    let projections: Vec<ProjectionRow> = pool
        .iter()
        .map(|p| ProjectionRow {
            name: if p.position == Position::DST {
                format!("{} D/ST", p.team)
            } else {
                p.name.clone()
            },
            team: Some(p.team.clone()),
            opponent: None,
            position: if p.position == Position::DST {
                "D/ST".to_string()
            } else {
                p.position.to_string()
            },
            projected_score: Some(p.projected_score()),
            bust_score: Some(p.bust_score()),
            boom_score: Some(p.boom_score()),
            bust_percentage: Some(p.projection.bust_percentage),
            boom_percentage: Some(p.projection.boom_percentage),
        })
        .collect();
    let salaries: Vec<SalaryRow> = pool
        .iter()
        .map(|p| SalaryRow {
            name: if p.position == Position::DST {
                format!("{} ", p.team)
            } else {
                p.name.clone()
            },
            name_id: p.platform_id.clone(),
            position: p.position.to_string(),
            salary: Some(p.salary as f64),
            game_info: Some(format!("{}@{} 10/20/2024 01:00PM ET", p.team, p.opponent)),
            team: Some(p.team.clone()),
        })
        .collect();

    let proj_path = temp_path("json");
    let sal_path = temp_path("json");
    std::fs::write(&proj_path, serde_json::to_string(&projections).unwrap()).unwrap();
    std::fs::write(&sal_path, serde_json::to_string(&salaries).unwrap()).unwrap();

    let loaded = load_merged_pool(&proj_path, &sal_path).unwrap();
    std::fs::remove_file(&proj_path).unwrap();
    std::fs::remove_file(&sal_path).unwrap();

    assert_eq!(loaded.players.len(), pool.len());
    assert!(loaded.rejected.is_empty());
    assert!(loaded.players.iter().all(|p| !p.opponent.is_empty()));

    let report = run(make_config(OptimizationMetric::Projected, 6), &loaded.players);
    assert!(!report.lineups.is_empty());
}

#[test]
fn test_report_round_trip_and_table() {
    let report = run(make_config(OptimizationMetric::Projected, 6), &slate());
    let path = temp_path("json");
    storage::save_report(&report, Some(&path)).unwrap();
    let loaded = storage::load_report(Some(&path)).unwrap().unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(lineup_keys(&loaded), lineup_keys(&report));

    let table = storage::lineup_table(&loaded);
    assert_eq!(table.len(), report.lineups.len() + 1);
    for (row, scored) in table[1..].iter().zip(&report.lineups) {
        assert_eq!(row[1], scored.lineup.player(Slot::Qb).id());
        assert_eq!(row[9], scored.lineup.player(Slot::Dst).id());
        assert_eq!(row[10], scored.lineup.total_salary.to_string());
    }
}

// ---- configuration ---------------------------------------------------------

#[test]
fn test_partial_toml_config() {
    let cfg = AppConfig::from_toml(
        r#"
        [optimizer]
        metric = "risk_adjusted"
        target_lineups = 10

        [optimizer.search]
        parallel = false
        time_limit_ms = 5000

        [input]
        pool_path = "pool.json"
        "#,
    )
    .unwrap();

    assert_eq!(cfg.optimizer.metric, OptimizationMetric::RiskAdjusted);
    assert_eq!(cfg.optimizer.target_lineups, 10);
    assert!(!cfg.optimizer.search.parallel);
    assert_eq!(cfg.optimizer.search.time_limit_ms, Some(5000));
    assert_eq!(cfg.optimizer.roster.salary_cap, 50_000);
    assert_eq!(cfg.input.pool_path.as_deref(), Some("pool.json"));

    let weights = cfg.optimizer.weights.total();
    assert!((weights - 1.0).abs() < stacker::config::WEIGHT_SUM_TOLERANCE);
}

#[test]
fn test_bad_weights_rejected() {
    let err = AppConfig::from_toml(
        r#"
        [optimizer.weights]
        primary = 0.70
        "#,
    );
    assert!(err.is_err());
}
