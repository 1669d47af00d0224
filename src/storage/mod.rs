//! Output persistence.
//!
//! Writes the optimization report as pretty JSON, and the ranked lineups as
//! a flat table (one row per lineup, one column per roster slot plus the
//! aggregates) into an `.xlsx` workbook.

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;
use tracing::{debug, info};

use crate::optimizer::OptimizationReport;
use crate::types::{Slot, StackerError};

/// Default report file path.
const DEFAULT_REPORT_FILE: &str = "stacker_lineups.json";

/// Column headers of the lineup table after the rank and slot columns.
const AGGREGATE_HEADERS: [&str; 11] = [
    "Salary",
    "Projected",
    "Risk_Adjusted",
    "Boom",
    "Bust",
    "Avg_Boom_Pct",
    "Avg_Bust_Pct",
    "Teams",
    "Diversity",
    "Flex_Quality",
    "Quality_Score",
];

/// Save the report to a JSON file.
pub fn save_report(report: &OptimizationReport, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_REPORT_FILE);
    let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;

    std::fs::write(path, &json).context(format!("Failed to write report to {path}"))?;

    debug!(path, lineups = report.lineups.len(), "Report saved");
    Ok(())
}

/// Load a report from a JSON file.
/// Returns None if the file doesn't exist.
pub fn load_report(path: Option<&str>) -> Result<Option<OptimizationReport>> {
    let path = path.unwrap_or(DEFAULT_REPORT_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved report found");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path).context(format!("Failed to read report from {path}"))?;

    let report: OptimizationReport =
        serde_json::from_str(&json).context(format!("Failed to parse report from {path}"))?;

    info!(
        path,
        run_id = %report.run_id,
        lineups = report.lineups.len(),
        "Report loaded from disk"
    );

    Ok(Some(report))
}

/// The lineup table: a header row, then one row per lineup in rank order.
/// Slot cells hold the salary-platform id when known, else the name.
pub fn lineup_table(report: &OptimizationReport) -> Vec<Vec<String>> {
    let mut header: Vec<String> = vec!["Rank".to_string()];
    header.extend(Slot::ALL.iter().map(|s| s.label().to_string()));
    header.extend(AGGREGATE_HEADERS.iter().map(|h| h.to_string()));

    let mut rows = vec![header];
    for (rank, scored) in report.lineups.iter().enumerate() {
        let lineup = &scored.lineup;
        let mut row = vec![(rank + 1).to_string()];
        row.extend(lineup.players().map(|p| p.id().to_string()));
        row.extend([
            lineup.total_salary.to_string(),
            format!("{:.2}", lineup.projected_score),
            format!("{:.2}", lineup.risk_adjusted_score),
            format!("{:.2}", lineup.boom_score),
            format!("{:.2}", lineup.bust_score),
            format!("{:.1}", lineup.avg_boom_percentage),
            format!("{:.1}", lineup.avg_bust_percentage),
            lineup.team_count.to_string(),
            format!("{:.2}", scored.breakdown.team_diversity),
            format!("{:.2}", scored.breakdown.flex_quality),
            format!("{:.3}", scored.quality_score),
        ]);
        rows.push(row);
    }
    rows
}

fn exposure_table(report: &OptimizationReport) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Player".to_string(),
        "Lineups".to_string(),
        "Exposure".to_string(),
    ]];
    rows.extend(report.exposures.iter().map(|e| {
        vec![
            e.player.clone(),
            e.count.to_string(),
            format!("{:.1}%", e.fraction * 100.0),
        ]
    }));
    rows
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

/// Write the lineup and exposure tables to an `.xlsx` workbook.
pub fn export_xlsx(report: &OptimizationReport, path: &str) -> Result<()> {
    if report.lineups.is_empty() {
        return Err(StackerError::Storage("no lineups to export".into()).into());
    }

    let lineups = lineup_table(report);
    let exposures = exposure_table(report);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Lineups")?;
        write_rows(sheet, &lineups)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Exposure")?;
        write_rows(sheet, &exposures)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed writing workbook to {path}"))?;

    info!(path, rows = lineups.len() - 1, "Lineup table exported");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
