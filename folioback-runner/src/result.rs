//! Report assembly — the serializable artifact of a completed run.
//!
//! Everything a consumer (CLI summary, JSON export, a future HTTP layer)
//! needs is assembled here from the engine output, with a `schema_version`
//! for forward-compatible deserialization.

use chrono::NaiveDate;
use folioback_core::domain::EquityCurvePoint;
use folioback_core::engine::SimulationOutput;
use serde::{Deserialize, Serialize};

use crate::config::{BacktestConfig, RunId};
use crate::metrics::{max_drawdown, DrawdownReport, PerformanceMetrics};
use crate::periods::{
    best_period, monthly_histogram, monthly_win_lose, period_returns, worst_period,
    Granularity, HistogramBucket, MonthlyWinLose, PeriodReturn,
};

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub base_currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metrics: PerformanceMetrics,
    pub max_drawdown: DrawdownReport,
    pub best_periods: PeriodExtremes,
    pub worst_periods: PeriodExtremes,
    pub monthly_win_lose_analysis: MonthlyWinLose,
    pub chart_data: ChartData,
}

/// Best or worst period per granularity; `None` when the run is too short
/// to contain one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodExtremes {
    pub daily: Option<PeriodReturn>,
    pub weekly: Option<PeriodReturn>,
    pub monthly: Option<PeriodReturn>,
    pub quarterly: Option<PeriodReturn>,
    pub yearly: Option<PeriodReturn>,
}

/// Series shaped for chart consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub portfolio_growth: Vec<GrowthPoint>,
    pub portfolio_balance: Vec<BalancePoint>,
    pub returns: ReturnSeries,
    pub monthly_returns_histogram: Vec<HistogramBucket>,
}

/// Equity versus money paid in, per trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub date: NaiveDate,
    pub total_value: f64,
    pub cumulative_contributions: f64,
}

/// Cash/holdings split per trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub holdings_value: f64,
}

/// Compounded period returns at every granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub daily: Vec<PeriodReturn>,
    pub weekly: Vec<PeriodReturn>,
    pub monthly: Vec<PeriodReturn>,
    pub quarterly: Vec<PeriodReturn>,
    pub yearly: Vec<PeriodReturn>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Assemble the full report from the engine output.
pub fn assemble_report(config: &BacktestConfig, output: &SimulationOutput) -> BacktestReport {
    let curve = &output.equity_curve;
    let metrics = PerformanceMetrics::compute(
        curve,
        config.backtest.initial_investment,
        output.dividend_income,
    );
    let returns = ReturnSeries {
        daily: period_returns(curve, Granularity::Daily),
        weekly: period_returns(curve, Granularity::Weekly),
        monthly: period_returns(curve, Granularity::Monthly),
        quarterly: period_returns(curve, Granularity::Quarterly),
        yearly: period_returns(curve, Granularity::Yearly),
    };

    BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        base_currency: config.backtest.base_currency.clone(),
        start_date: config.backtest.start_date,
        end_date: config.backtest.end_date,
        metrics,
        max_drawdown: max_drawdown(curve),
        best_periods: extremes(&returns, best_period),
        worst_periods: extremes(&returns, worst_period),
        monthly_win_lose_analysis: monthly_win_lose(&returns.monthly),
        chart_data: ChartData {
            portfolio_growth: growth_series(curve),
            portfolio_balance: balance_series(curve),
            monthly_returns_histogram: monthly_histogram(&returns.monthly),
            returns,
        },
    }
}

fn extremes(
    returns: &ReturnSeries,
    pick: fn(&[PeriodReturn]) -> Option<&PeriodReturn>,
) -> PeriodExtremes {
    PeriodExtremes {
        daily: pick(&returns.daily).cloned(),
        weekly: pick(&returns.weekly).cloned(),
        monthly: pick(&returns.monthly).cloned(),
        quarterly: pick(&returns.quarterly).cloned(),
        yearly: pick(&returns.yearly).cloned(),
    }
}

fn growth_series(curve: &[EquityCurvePoint]) -> Vec<GrowthPoint> {
    curve
        .iter()
        .map(|p| GrowthPoint {
            date: p.date,
            total_value: p.total_value,
            cumulative_contributions: p.cumulative_contributions,
        })
        .collect()
}

fn balance_series(curve: &[EquityCurvePoint]) -> Vec<BalancePoint> {
    curve
        .iter()
        .map(|p| BalancePoint {
            date: p.date,
            cash: p.cash,
            holdings_value: p.holdings_value(),
        })
        .collect()
}
