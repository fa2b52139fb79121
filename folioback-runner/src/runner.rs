//! Backtest runner — wires together config, data, engine, and reporting.
//!
//! Two entry points:
//! - `run_backtest()`: one config against a pre-loaded market snapshot.
//! - `run_batch()`: independent configs in parallel via rayon; each run is
//!   strictly sequential internally.

use folioback_core::calendar::SimCalendar;
use folioback_core::data::MarketSnapshot;
use folioback_core::engine::{run_simulation, TargetWeightResolver};
use folioback_core::error::{ConfigError, EngineError};
use log::info;
use rayon::prelude::*;
use thiserror::Error;

use crate::config::BacktestConfig;
use crate::data_loader::LoadError;
use crate::result::{assemble_report, BacktestReport};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Run a single backtest against an already-loaded market snapshot.
///
/// Validates the config, restricts the snapshot to the requested tickers
/// and window, simulates, and assembles the report. Any failure aborts the
/// whole run; there are no partial reports.
pub fn run_backtest(
    config: &BacktestConfig,
    market: &MarketSnapshot,
) -> Result<BacktestReport, RunError> {
    let engine_config = config.to_engine_config()?;

    let tickers = config.tickers();
    let ticker_refs: Vec<&str> = tickers.iter().map(|t| t.as_str()).collect();
    let window = market.query(
        &ticker_refs,
        config.backtest.start_date,
        config.backtest.end_date,
    )?;

    let calendar = SimCalendar::build(
        config.backtest.start_date,
        config.backtest.end_date,
        engine_config.strategy.rebalance_frequency,
        config.contribution_frequency(),
        &window.trading_dates(),
    )?;

    let resolver = TargetWeightResolver::new(engine_config.strategy.fractional_shares);
    let output = run_simulation(&engine_config, &calendar, &window, &resolver)?;
    info!(
        "run {}: {} trading days, final value {:.2}, {} rebalances",
        &config.run_id()[..12],
        output.equity_curve.len(),
        output.final_value,
        output.rebalance_count
    );
    Ok(assemble_report(config, &output))
}

/// Run independent configs in parallel against a shared snapshot.
///
/// Results come back in input order, each with its own pass/fail status.
pub fn run_batch(
    configs: &[BacktestConfig],
    market: &MarketSnapshot,
) -> Vec<Result<BacktestReport, RunError>> {
    configs
        .par_iter()
        .map(|config| run_backtest(config, market))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folioback_core::data::AssetPrice;

    fn flat_market(ticker: &str, days: &[&str], close: f64) -> MarketSnapshot {
        let prices = days
            .iter()
            .map(|d| AssetPrice {
                ticker: ticker.to_string(),
                date: d.parse().unwrap(),
                adjusted_close: close,
            })
            .collect();
        MarketSnapshot::from_events(prices, vec![])
    }

    fn config(toml: &str) -> BacktestConfig {
        BacktestConfig::from_toml_str(toml).unwrap()
    }

    #[test]
    fn flat_market_run_preserves_value() {
        let market = flat_market("SPY", &["2024-01-02", "2024-01-03", "2024-01-04"], 100.0);
        let report = run_backtest(
            &config(
                r#"
                    [backtest]
                    start_date = "2024-01-01"
                    end_date = "2024-01-05"
                    initial_investment = 10000.0

                    [allocation]
                    SPY = 1.0
                "#,
            ),
            &market,
        )
        .unwrap();
        assert!((report.metrics.final_value - 10_000.0).abs() < 1e-9);
        assert_eq!(report.metrics.cagr, 0.0);
        assert_eq!(report.metrics.volatility, 0.0);
    }

    #[test]
    fn unknown_ticker_fails_before_simulation() {
        let market = flat_market("SPY", &["2024-01-02"], 100.0);
        let err = run_backtest(
            &config(
                r#"
                    [backtest]
                    start_date = "2024-01-01"
                    end_date = "2024-01-05"
                    initial_investment = 10000.0

                    [allocation]
                    VTI = 1.0
                "#,
            ),
            &market,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RunError::Config(ConfigError::NoCoverage { .. })
        ));
    }

    #[test]
    fn batch_preserves_input_order() {
        let market = flat_market("SPY", &["2024-01-02", "2024-01-03"], 100.0);
        let good = config(
            r#"
                [backtest]
                start_date = "2024-01-01"
                end_date = "2024-01-04"
                initial_investment = 10000.0

                [allocation]
                SPY = 1.0
            "#,
        );
        let mut bad = good.clone();
        bad.backtest.end_date = bad.backtest.start_date;

        let results = run_batch(&[good.clone(), bad, good], &market);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
