//! Equity curve — the day-indexed record the metrics layer consumes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-ticker slice of a daily equity curve point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub ticker: String,
    pub shares: f64,
    pub price: f64,
    pub value: f64,
    /// Fraction of `total_value` held in this ticker.
    pub weight: f64,
}

/// One appended entry per trading day, owned by the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub date: NaiveDate,
    pub total_value: f64,
    pub cash: f64,
    /// Cash added to the portfolio on this day (initial funding, recurring
    /// contribution), zero otherwise. Metrics use it to net returns.
    pub cash_inflow: f64,
    /// `initial_investment` plus all contributions applied so far.
    /// Non-decreasing across the curve.
    pub cumulative_contributions: f64,
    pub positions: Vec<PositionSnapshot>,
}

impl EquityCurvePoint {
    /// Holdings value implied by the point (total minus cash).
    pub fn holdings_value(&self) -> f64 {
        self.total_value - self.cash
    }
}
