//! Portfolio state — cash plus per-ticker share counts.

use std::collections::{BTreeMap, HashMap};

/// Mutable portfolio state, advanced exactly once per simulated day.
///
/// The valuation identity must hold at every equity curve point:
/// `total_value == cash + sum(shares * price)`.
#[derive(Debug, Clone, Default)]
pub struct PortfolioState {
    pub cash: f64,
    pub holdings: BTreeMap<String, f64>,
}

impl PortfolioState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cash(&mut self, amount: f64) {
        self.cash += amount;
    }

    pub fn shares(&self, ticker: &str) -> f64 {
        self.holdings.get(ticker).copied().unwrap_or(0.0)
    }

    /// Add (or, negative, remove) shares of a ticker.
    pub fn adjust_shares(&mut self, ticker: &str, delta: f64) {
        let entry = self.holdings.entry(ticker.to_string()).or_insert(0.0);
        *entry += delta;
    }

    /// Market value of all holdings at the given prices.
    ///
    /// Tickers without a price contribute nothing; the engine guarantees held
    /// tickers always have a usable price before calling this.
    pub fn holdings_value(&self, prices: &HashMap<String, f64>) -> f64 {
        self.holdings
            .iter()
            .map(|(ticker, shares)| shares * prices.get(ticker).copied().unwrap_or(0.0))
            .sum()
    }

    /// Total investable value: cash plus marked-to-market holdings.
    pub fn total_value(&self, prices: &HashMap<String, f64>) -> f64 {
        self.cash + self.holdings_value(prices)
    }
}
