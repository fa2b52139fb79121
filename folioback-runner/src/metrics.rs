//! Performance metrics — pure functions over the equity curve.
//!
//! Every metric is a pure function: equity curve in, scalar (or small
//! struct) out. No dependencies on the runner, data loading, or the engine.
//!
//! Daily returns are netted for same-day cash inflows
//! (`r_t = (v_t − inflow_t) / v_{t−1} − 1`), so a contribution landing on a
//! flat market reads as a 0% day rather than a phantom gain. With no
//! contributions this reduces to the plain curve return.

use chrono::NaiveDate;
use folioback_core::domain::EquityCurvePoint;
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub final_value: f64,
    pub total_contributions: f64,
    /// `final_value / initial_investment − 1`.
    pub cumulative_return: f64,
    /// `final_value − total_contributions`: profit in currency terms.
    pub cumulative_gain: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub dividend_income: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from the equity curve.
    pub fn compute(
        curve: &[EquityCurvePoint],
        initial_investment: f64,
        dividend_income: f64,
    ) -> Self {
        let final_value = curve.last().map(|p| p.total_value).unwrap_or(0.0);
        let total_contributions = curve
            .last()
            .map(|p| p.cumulative_contributions)
            .unwrap_or(0.0);
        let returns = net_daily_returns(curve);
        Self {
            final_value,
            total_contributions,
            cumulative_return: cumulative_return(final_value, initial_investment),
            cumulative_gain: final_value - total_contributions,
            cagr: cagr(curve, initial_investment),
            volatility: volatility(&returns),
            sharpe: sharpe_ratio(&returns, 0.0),
            dividend_income,
        }
    }
}

/// Maximum drawdown with its shape: peak, trough, and recovery (if any).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownReport {
    /// Most negative `(v − peak) / peak`; 0.0 for a non-decreasing curve.
    pub max_drawdown: f64,
    pub peak_date: Option<NaiveDate>,
    pub trough_date: Option<NaiveDate>,
    /// First date the curve regained the peak, `None` if it never did.
    pub recovery_date: Option<NaiveDate>,
}

// ─── Individual metric functions ────────────────────────────────────

/// Cumulative return as a fraction of the initial investment.
pub fn cumulative_return(final_value: f64, initial_investment: f64) -> f64 {
    if initial_investment <= 0.0 {
        return 0.0;
    }
    final_value / initial_investment - 1.0
}

/// Compound Annual Growth Rate over calendar time.
///
/// Uses 365.25 calendar days per year between the first and last curve
/// dates. Returns 0.0 for sub-day spans or non-positive endpoints.
pub fn cagr(curve: &[EquityCurvePoint], initial_investment: f64) -> f64 {
    if curve.len() < 2 || initial_investment <= 0.0 {
        return 0.0;
    }
    let final_value = curve[curve.len() - 1].total_value;
    if final_value <= 0.0 {
        return 0.0;
    }
    let days = (curve[curve.len() - 1].date - curve[0].date).num_days();
    if days <= 0 {
        return 0.0;
    }
    (final_value / initial_investment).powf(365.25 / days as f64) - 1.0
}

/// Annualized volatility: std of daily net returns × √252.
pub fn volatility(returns: &[f64]) -> f64 {
    std_dev(returns) * (252.0_f64).sqrt()
}

/// Annualized Sharpe ratio from daily net returns.
///
/// Sharpe = annualized mean excess return / annualized volatility.
/// Returns 0.0 if variance is zero or fewer than 2 returns.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_rf = risk_free_rate / 252.0;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let vol = volatility(&excess);
    if vol < 1e-15 {
        return 0.0;
    }
    mean_f64(&excess) * 252.0 / vol
}

/// Maximum drawdown in a single forward pass with a running peak.
pub fn max_drawdown(curve: &[EquityCurvePoint]) -> DrawdownReport {
    let mut report = DrawdownReport {
        max_drawdown: 0.0,
        peak_date: None,
        trough_date: None,
        recovery_date: None,
    };
    if curve.len() < 2 {
        return report;
    }

    let mut peak = curve[0].total_value;
    let mut peak_date = curve[0].date;
    let mut worst_peak_value = 0.0;
    for point in curve {
        if point.total_value > peak {
            peak = point.total_value;
            peak_date = point.date;
        }
        if peak > 0.0 {
            let dd = (point.total_value - peak) / peak;
            if dd < report.max_drawdown {
                report.max_drawdown = dd;
                report.peak_date = Some(peak_date);
                report.trough_date = Some(point.date);
                worst_peak_value = peak;
            }
        }
    }

    // Recovery: the first point after the trough that regains the peak.
    if let Some(trough) = report.trough_date {
        report.recovery_date = curve
            .iter()
            .filter(|p| p.date > trough)
            .find(|p| p.total_value >= worst_peak_value)
            .map(|p| p.date);
    }
    report
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Daily returns netted for same-day cash inflows.
pub fn net_daily_returns(curve: &[EquityCurvePoint]) -> Vec<f64> {
    if curve.len() < 2 {
        return Vec::new();
    }
    curve
        .windows(2)
        .map(|w| {
            if w[0].total_value > 0.0 {
                (w[1].total_value - w[1].cash_inflow) / w[0].total_value - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
