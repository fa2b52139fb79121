//! Target allocation — the ticker → weight mapping a run steers toward.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance on the raw weight sum before normalization.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

/// A validated set of target portfolio weights.
///
/// Weights are re-scaled so they sum to exactly 1.0, after checking the raw
/// sum is within [`WEIGHT_SUM_TOLERANCE`] of 1.0. Immutable for the duration
/// of a run. A `BTreeMap` keeps iteration (and therefore trade application
/// and serialized output) in a stable ticker order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAllocation {
    weights: BTreeMap<String, f64>,
}

impl TargetAllocation {
    /// Build from raw weights, validating and normalizing.
    pub fn new(raw: BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::EmptyAllocation);
        }
        for (ticker, &weight) in &raw {
            if !(weight > 0.0 && weight <= 1.0) || !weight.is_finite() {
                return Err(ConfigError::InvalidWeight {
                    ticker: ticker.clone(),
                    weight,
                });
            }
        }
        let sum: f64 = raw.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsNotNormalized {
                sum,
                tolerance: WEIGHT_SUM_TOLERANCE,
            });
        }
        let weights = raw.into_iter().map(|(t, w)| (t, w / sum)).collect();
        Ok(Self { weights })
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(|t| t.as_str())
    }

    pub fn weight(&self, ticker: &str) -> Option<f64> {
        self.weights.get(ticker).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(t, &w)| (t.as_str(), w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
