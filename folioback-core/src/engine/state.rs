//! Engine configuration and run output types.

use crate::domain::{
    EquityCurvePoint, RecurringContribution, ResolvedStrategy, TargetAllocation,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// What to do when a held ticker has no price on a simulated trading day
/// (e.g., an exchange holiday while other tickers trade).
///
/// This only ever affects valuation. Trading — a rebalance, funding buy, or
/// dividend reinvestment — always requires a live price and fails otherwise;
/// the engine never executes against a substituted price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapPolicy {
    /// Abort the run with `MissingPriceData`.
    #[default]
    Fail,
    /// Value the position at its last seen close.
    CarryForward,
}

/// Validated input for a single simulation run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub initial_investment: f64,
    pub allocation: TargetAllocation,
    pub strategy: ResolvedStrategy,
    pub contribution: Option<RecurringContribution>,
    pub gap_policy: GapPolicy,
}

impl EngineConfig {
    /// Check the numeric preconditions the loop depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_investment > 0.0) || !self.initial_investment.is_finite() {
            return Err(ConfigError::NonPositiveAmount {
                field: "initial investment",
                value: self.initial_investment,
            });
        }
        if let Some(contribution) = &self.contribution {
            contribution.validate()?;
        }
        Ok(())
    }
}

/// Everything the simulation loop produces; consumed by the metrics layer.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    /// One point per trading day, in ascending date order.
    pub equity_curve: Vec<EquityCurvePoint>,
    pub final_value: f64,
    /// Initial investment plus every applied recurring contribution.
    pub total_contributions: f64,
    /// Number of scheduled rebalances that actually traded.
    pub rebalance_count: usize,
    /// Dividend cash generated over the run (reinvested or credited).
    pub dividend_income: f64,
}
