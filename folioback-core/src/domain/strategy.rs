//! Strategy configuration: mode, cadences, dividend and share policies.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Simulation mode.
///
/// `Basic` is the frictionless idealization: it forces fractional shares and
/// dividend reinvestment on. `Realistic` honors the configured flags, so
/// whole-share rounding and cash dividends become possible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Basic,
    Realistic,
}

/// Shared cadence enum for rebalancing and recurring contributions.
///
/// For contributions `Never` means "disabled".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    #[default]
    Never,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

/// Raw strategy settings as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub fractional_shares: bool,
    pub reinvest_dividends: bool,
    pub rebalance_frequency: Frequency,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fractional_shares: true,
            reinvest_dividends: true,
            rebalance_frequency: Frequency::Never,
        }
    }
}

impl StrategyConfig {
    /// Materialize the mode-dependent defaults once, at validation time.
    ///
    /// The simulation loop only ever sees the resolved form and never
    /// re-branches on the mode.
    pub fn resolve(self, mode: Mode) -> ResolvedStrategy {
        match mode {
            Mode::Basic => ResolvedStrategy {
                mode,
                fractional_shares: true,
                reinvest_dividends: true,
                rebalance_frequency: self.rebalance_frequency,
            },
            Mode::Realistic => ResolvedStrategy {
                mode,
                fractional_shares: self.fractional_shares,
                reinvest_dividends: self.reinvest_dividends,
                rebalance_frequency: self.rebalance_frequency,
            },
        }
    }
}

/// Strategy settings after mode resolution; what the engine actually runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStrategy {
    pub mode: Mode,
    pub fractional_shares: bool,
    pub reinvest_dividends: bool,
    pub rebalance_frequency: Frequency,
}

/// A scheduled periodic cash injection into the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecurringContribution {
    pub amount: f64,
    pub frequency: Frequency,
}

impl RecurringContribution {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.amount > 0.0) || !self.amount.is_finite() {
            return Err(ConfigError::NonPositiveAmount {
                field: "recurring contribution amount",
                value: self.amount,
            });
        }
        Ok(())
    }

    /// Whether this contribution schedule ever fires.
    pub fn is_active(&self) -> bool {
        self.frequency != Frequency::Never
    }
}
