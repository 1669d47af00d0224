//! STACKER — stack-seeded NFL DFS lineup optimizer
//!
//! Entry point. Loads configuration, initialises structured logging, reads
//! the player pool, runs the optimizer off the async runtime and writes the
//! ranked lineups to disk.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::{info, warn};

use stacker::config::{self, AppConfig};
use stacker::data::{self, PoolLoad};
use stacker::optimizer::{LineupOptimizer, OptimizationReport};
use stacker::storage;
use stacker::types::Slot;

const BANNER: &str = r#"
 ____ _____  _    ____ _  _______ ____
/ ___|_   _|/ \  / ___| |/ / ____|  _ \
\___ \ | | / _ \| |   | ' /|  _| | |_) |
 ___) || |/ ___ \ |___| . \| |___|  _ <
|____/ |_/_/   \_\____|_|\_\_____|_| \_\

  Stack-seeded NFL DFS lineup optimizer
  v0.1.0
"#;

/// Default config path when none is given on the command line.
const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config_found = Path::new(&config_path).exists();
    let cfg = if config_found {
        AppConfig::load(&config_path)?
    } else {
        AppConfig::default()
    };

    init_logging();

    println!("{BANNER}");
    if !config_found {
        warn!(path = %config_path, "Config file not found, using defaults");
    }
    info!(
        config = %config_path,
        metric = %cfg.optimizer.metric,
        target_lineups = cfg.optimizer.target_lineups,
        salary_cap = cfg.optimizer.roster.salary_cap,
        "STACKER starting up"
    );

    // -- Player pool -----------------------------------------------------

    let pool = load_players(&cfg.input)?;
    if pool.players.is_empty() {
        bail!("Player pool is empty ({} records rejected)", pool.rejected.len());
    }

    // -- Optimize --------------------------------------------------------

    let optimizer = LineupOptimizer::new(cfg.optimizer.clone())?;
    let players = pool.players;
    let report = tokio::task::spawn_blocking(move || optimizer.optimize(&players))
        .await
        .context("Optimizer task failed")?;

    log_report(&report);

    // -- Export ----------------------------------------------------------

    storage::save_report(&report, Some(&cfg.output.json_path))?;
    info!(path = %cfg.output.json_path, "Report written");

    match &cfg.output.xlsx_path {
        Some(path) if !report.lineups.is_empty() => storage::export_xlsx(&report, path)?,
        Some(path) => warn!(path = %path, "No lineups, skipping table export"),
        None => {}
    }

    Ok(())
}

/// Read the pool from a pre-joined file, or join projections with salaries.
fn load_players(input: &config::InputConfig) -> Result<PoolLoad> {
    if let Some(path) = &input.pool_path {
        return data::load_pool(path);
    }
    match (&input.projections_path, &input.salaries_path) {
        (Some(projections), Some(salaries)) => data::load_merged_pool(projections, salaries),
        _ => bail!("No input configured: set input.pool_path, or both input.projections_path and input.salaries_path"),
    }
}

/// Log a human-readable run summary.
fn log_report(report: &OptimizationReport) {
    if let Some(reason) = &report.metric.fallback_reason {
        warn!(reason = %reason, "Metric fallback");
    }

    for (rank, scored) in report.lineups.iter().take(5).enumerate() {
        let players: Vec<String> = Slot::ALL
            .iter()
            .map(|slot| format!("{}={}", slot, scored.lineup.player(*slot).name))
            .collect();
        info!(
            rank = rank + 1,
            quality = format!("{:.2}", scored.quality_score),
            points = format!("{:.2}", scored.lineup.metric_total(report.effective_metric())),
            salary = scored.lineup.total_salary,
            teams = scored.lineup.team_count,
            lineup = %players.join(", "),
            "Top lineup"
        );
    }

    info!(
        run_id = %report.run_id,
        metric = %report.effective_metric(),
        lineups = report.lineups.len(),
        requested = report.requested_lineups,
        shortfall = report.shortfall,
        discarded = report.discarded.len(),
        nodes = report.stats.nodes_explored,
        elapsed_ms = report.stats.elapsed_ms,
        bound_exhausted = report.stats.bound_exhausted,
        "STACKER run complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stacker=info"));

    let json_logging = std::env::var("STACKER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
