//! Structured error types for the simulation engine.
//!
//! The engine never recovers into a partial result: any error aborts the whole
//! run, because metrics over an incomplete equity curve would be numerically
//! unsound. Callers map these onto a terminal job status or exit code.

use chrono::NaiveDate;
use thiserror::Error;

/// Pre-simulation validation failures. Fatal, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid date range: start {start} must be before end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("target weights sum to {sum:.6}, expected 1.0 within {tolerance}")]
    WeightsNotNormalized { sum: f64, tolerance: f64 },

    #[error("target allocation has no tickers")]
    EmptyAllocation,

    #[error("weight for '{ticker}' is {weight}; weights must be in (0, 1]")]
    InvalidWeight { ticker: String, weight: f64 },

    #[error("invalid {field}: {value} must be positive")]
    NonPositiveAmount { field: &'static str, value: f64 },

    #[error("no trading days between {start} and {end} for the requested tickers")]
    NoTradingDays { start: NaiveDate, end: NaiveDate },

    #[error("no price data for '{ticker}' between {start} and {end}")]
    NoCoverage {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Errors raised while the simulation loop is running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A held or to-be-allocated ticker has no price on a required trading
    /// day. The engine never substitutes or interpolates; backfill belongs
    /// to the upstream data collaborator.
    #[error("missing price for '{ticker}' on {date}")]
    MissingPriceData { ticker: String, date: NaiveDate },

    #[error("computation error: {0}")]
    Computation(String),
}
