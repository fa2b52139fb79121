//! Serializable backtest configuration.
//!
//! The TOML surface a caller writes; `to_engine_config()` turns it into the
//! validated form the core engine runs on. Mode-dependent defaults are
//! materialized here, once, never per simulated day.

use chrono::NaiveDate;
use folioback_core::domain::{
    Frequency, Mode, RecurringContribution, StrategyConfig, TargetAllocation,
};
use folioback_core::engine::{EngineConfig, GapPolicy};
use folioback_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Serializable configuration for a single backtest run.
///
/// Captures everything needed to reproduce the run: date range, funding,
/// target allocation, strategy flags, and the optional contribution
/// schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,

    /// Ticker → raw weight. Must sum to 1.0 within tolerance.
    pub allocation: BTreeMap<String, f64>,

    #[serde(default)]
    pub strategy: StrategySection,

    /// Optional recurring cash contribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution: Option<ContributionSection>,
}

/// The `[backtest]` table: run window and funding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestSection {
    /// Simulation start (inclusive); the first trading day on or after it
    /// is the funding day.
    pub start_date: NaiveDate,

    /// Simulation end (inclusive).
    pub end_date: NaiveDate,

    pub initial_investment: f64,

    /// Reporting currency. Series are assumed already converted upstream;
    /// this is carried into the report as metadata.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,

    #[serde(default)]
    pub mode: Mode,
}

/// The `[strategy]` table. Every field has a default, so the table itself
/// is optional.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StrategySection {
    #[serde(default = "default_true")]
    pub fractional_shares: bool,

    #[serde(default = "default_true")]
    pub reinvest_dividends: bool,

    #[serde(default)]
    pub rebalance_frequency: Frequency,

    #[serde(default)]
    pub gap_policy: GapPolicy,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            fractional_shares: true,
            reinvest_dividends: true,
            rebalance_frequency: Frequency::Never,
            gap_policy: GapPolicy::Fail,
        }
    }
}

/// The `[contribution]` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ContributionSection {
    pub amount: f64,
    pub frequency: Frequency,
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}

impl BacktestConfig {
    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs get the same RunId, so results can
    /// be compared or deduplicated by ID.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("BacktestConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Tickers named by the allocation, in stable order.
    pub fn tickers(&self) -> Vec<String> {
        self.allocation.keys().cloned().collect()
    }

    /// Validate and lower into the engine's input form.
    ///
    /// All `ConfigError`s surface here, before any data is touched.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        if self.backtest.start_date >= self.backtest.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.backtest.start_date,
                end: self.backtest.end_date,
            });
        }
        let allocation = TargetAllocation::new(self.allocation.clone())?;
        let strategy = StrategyConfig {
            fractional_shares: self.strategy.fractional_shares,
            reinvest_dividends: self.strategy.reinvest_dividends,
            rebalance_frequency: self.strategy.rebalance_frequency,
        }
        .resolve(self.backtest.mode);
        let contribution = match self.contribution {
            Some(section) => {
                let contribution = RecurringContribution {
                    amount: section.amount,
                    frequency: section.frequency,
                };
                contribution.validate()?;
                contribution.is_active().then_some(contribution)
            }
            None => None,
        };
        let engine = EngineConfig {
            initial_investment: self.backtest.initial_investment,
            allocation,
            strategy,
            contribution,
            gap_policy: self.strategy.gap_policy,
        };
        engine.validate()?;
        Ok(engine)
    }

    /// Contribution frequency for calendar construction (`Never` when the
    /// schedule is absent or disabled).
    pub fn contribution_frequency(&self) -> Frequency {
        self.contribution
            .map(|c| c.frequency)
            .unwrap_or(Frequency::Never)
    }
}
