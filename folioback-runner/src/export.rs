//! Reporting and export — JSON and CSV artifact generation.
//!
//! Persisted artifacts carry a `schema_version` field; versions newer than
//! this build understands are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::result::{BacktestReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestReport` to pretty JSON.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the equity curve as CSV.
///
/// Columns: date, total_value, cash, holdings_value, cumulative_contributions
pub fn export_equity_csv(report: &BacktestReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "total_value",
        "cash",
        "holdings_value",
        "cumulative_contributions",
    ])?;
    for (growth, balance) in report
        .chart_data
        .portfolio_growth
        .iter()
        .zip(&report.chart_data.portfolio_balance)
    {
        wtr.write_record([
            growth.date.to_string(),
            format!("{:.2}", growth.total_value),
            format!("{:.2}", balance.cash),
            format!("{:.2}", balance.holdings_value),
            format!("{:.2}", growth.cumulative_contributions),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

// ─── File helpers ───────────────────────────────────────────────────

/// Write `report.json` and `equity.csv` into `dir`, returning the paths.
pub fn write_artifacts(report: &BacktestReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir {}", dir.display()))?;
    let json_path = dir.join("report.json");
    std::fs::write(&json_path, export_json(report)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;
    let csv_path = dir.join("equity.csv");
    std::fs::write(&csv_path, export_equity_csv(report)?)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;
    Ok(vec![json_path, csv_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BacktestConfig;
    use crate::result::assemble_report;
    use folioback_core::domain::EquityCurvePoint;
    use folioback_core::engine::SimulationOutput;

    fn report() -> BacktestReport {
        let config = BacktestConfig::from_toml_str(
            r#"
                [backtest]
                start_date = "2024-01-01"
                end_date = "2024-01-05"
                initial_investment = 10000.0

                [allocation]
                SPY = 1.0
            "#,
        )
        .unwrap();
        let curve: Vec<EquityCurvePoint> = [
            ("2024-01-02", 10_000.0, 10_000.0),
            ("2024-01-03", 10_150.0, 0.0),
        ]
        .iter()
        .map(|(date, value, inflow)| EquityCurvePoint {
            date: date.parse().unwrap(),
            total_value: *value,
            cash: 0.0,
            cash_inflow: *inflow,
            cumulative_contributions: 10_000.0,
            positions: Vec::new(),
        })
        .collect();
        let output = SimulationOutput {
            final_value: 10_150.0,
            total_contributions: 10_000.0,
            rebalance_count: 0,
            dividend_income: 0.0,
            equity_curve: curve,
        };
        assemble_report(&config, &output)
    }

    #[test]
    fn json_round_trip_preserves_run_id() {
        let report = report();
        let json = export_json(&report).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, report.run_id);
    }

    #[test]
    fn newer_schema_version_is_rejected() {
        let mut report = report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&report).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn equity_csv_has_header_and_one_row_per_day() {
        let csv = export_equity_csv(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,total_value"));
        assert!(lines[1].starts_with("2024-01-02,10000.00"));
    }

    #[test]
    fn artifacts_land_in_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(&report(), dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.exists()));
    }
}
