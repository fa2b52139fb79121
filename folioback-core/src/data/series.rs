//! Immutable price/dividend series snapshot.

use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One adjusted daily close for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPrice {
    pub ticker: String,
    pub date: NaiveDate,
    pub adjusted_close: f64,
}

/// One dividend payout event for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub ticker: String,
    pub date: NaiveDate,
    pub amount_per_share: f64,
}

/// Read-only market data for a set of tickers over a date range.
///
/// Safe to share across concurrently executing runs: nothing here is mutated
/// after construction. Per-ticker series are keyed by date for O(log n)
/// point lookups and ordered iteration.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    prices: HashMap<String, BTreeMap<NaiveDate, f64>>,
    dividends: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl MarketSnapshot {
    /// Build a snapshot from flat event lists.
    pub fn from_events(prices: Vec<AssetPrice>, dividends: Vec<DividendEvent>) -> Self {
        let mut snapshot = Self::default();
        for p in prices {
            snapshot
                .prices
                .entry(p.ticker)
                .or_default()
                .insert(p.date, p.adjusted_close);
        }
        for d in dividends {
            snapshot
                .dividends
                .entry(d.ticker)
                .or_default()
                .insert(d.date, d.amount_per_share);
        }
        snapshot
    }

    /// Restrict the snapshot to `tickers` over `[start, end]`.
    ///
    /// Fails loudly when a requested ticker has no prices at all in range —
    /// the engine never runs over partial universes.
    pub fn query(
        &self,
        tickers: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MarketSnapshot, ConfigError> {
        let mut out = MarketSnapshot::default();
        for &ticker in tickers {
            let series: BTreeMap<NaiveDate, f64> = self
                .prices
                .get(ticker)
                .map(|s| {
                    s.range(start..=end)
                        .map(|(&date, &price)| (date, price))
                        .collect()
                })
                .unwrap_or_default();
            if series.is_empty() {
                return Err(ConfigError::NoCoverage {
                    ticker: ticker.to_string(),
                    start,
                    end,
                });
            }
            out.prices.insert(ticker.to_string(), series);

            if let Some(divs) = self.dividends.get(ticker) {
                let in_range: BTreeMap<NaiveDate, f64> = divs
                    .range(start..=end)
                    .map(|(&date, &amount)| (date, amount))
                    .collect();
                if !in_range.is_empty() {
                    out.dividends.insert(ticker.to_string(), in_range);
                }
            }
        }
        Ok(out)
    }

    /// Adjusted close for a ticker on an exact date.
    pub fn price(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.prices.get(ticker)?.get(&date).copied()
    }

    /// Most recent adjusted close on or before `date` (carry-forward lookups).
    pub fn last_price_on_or_before(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.prices
            .get(ticker)?
            .range(..=date)
            .next_back()
            .map(|(_, &price)| price)
    }

    /// Dividend per share for a ticker on a date, if one was paid.
    pub fn dividend(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.dividends.get(ticker)?.get(&date).copied()
    }

    /// Union of all dates on which at least one ticker has a price.
    pub fn trading_dates(&self) -> BTreeSet<NaiveDate> {
        self.prices
            .values()
            .flat_map(|series| series.keys().copied())
            .collect()
    }

    pub fn tickers(&self) -> Vec<&str> {
        let mut tickers: Vec<&str> = self.prices.keys().map(|t| t.as_str()).collect();
        tickers.sort_unstable();
        tickers
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Flatten back to price events, ticker-sorted then date-ordered.
    /// For deterministic CSV export.
    pub fn price_events(&self) -> Vec<AssetPrice> {
        let mut out = Vec::new();
        for ticker in self.tickers() {
            if let Some(series) = self.prices.get(ticker) {
                out.extend(series.iter().map(|(&date, &adjusted_close)| AssetPrice {
                    ticker: ticker.to_string(),
                    date,
                    adjusted_close,
                }));
            }
        }
        out
    }

    /// Flatten back to dividend events in the same stable order.
    pub fn dividend_events(&self) -> Vec<DividendEvent> {
        let mut tickers: Vec<&str> = self.dividends.keys().map(|t| t.as_str()).collect();
        tickers.sort_unstable();
        let mut out = Vec::new();
        for ticker in tickers {
            if let Some(series) = self.dividends.get(ticker) {
                out.extend(series.iter().map(|(&date, &amount_per_share)| DividendEvent {
                    ticker: ticker.to_string(),
                    date,
                    amount_per_share,
                }));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn price(ticker: &str, date: NaiveDate, close: f64) -> AssetPrice {
        AssetPrice {
            ticker: ticker.into(),
            date,
            adjusted_close: close,
        }
    }

    fn sample() -> MarketSnapshot {
        MarketSnapshot::from_events(
            vec![
                price("AAPL", d(2020, 1, 2), 100.0),
                price("AAPL", d(2020, 1, 3), 101.0),
                price("AAPL", d(2020, 1, 6), 102.0),
                price("GOOG", d(2020, 1, 2), 60.0),
                price("GOOG", d(2020, 1, 6), 61.0),
            ],
            vec![DividendEvent {
                ticker: "AAPL".into(),
                date: d(2020, 1, 3),
                amount_per_share: 0.5,
            }],
        )
    }

    #[test]
    fn exact_price_lookup() {
        let snap = sample();
        assert_eq!(snap.price("AAPL", d(2020, 1, 3)), Some(101.0));
        assert_eq!(snap.price("AAPL", d(2020, 1, 4)), None);
        assert_eq!(snap.price("TSLA", d(2020, 1, 2)), None);
    }

    #[test]
    fn carry_forward_lookup_finds_previous_close() {
        let snap = sample();
        // GOOG has no bar on Jan 3; last close is Jan 2.
        assert_eq!(snap.last_price_on_or_before("GOOG", d(2020, 1, 3)), Some(60.0));
        assert_eq!(snap.last_price_on_or_before("GOOG", d(2020, 1, 1)), None);
    }

    #[test]
    fn trading_dates_are_the_union() {
        let snap = sample();
        let dates: Vec<NaiveDate> = snap.trading_dates().into_iter().collect();
        assert_eq!(dates, vec![d(2020, 1, 2), d(2020, 1, 3), d(2020, 1, 6)]);
    }

    #[test]
    fn query_restricts_range() {
        let snap = sample();
        let sub = snap.query(&["AAPL"], d(2020, 1, 3), d(2020, 1, 6)).unwrap();
        assert_eq!(sub.price("AAPL", d(2020, 1, 2)), None);
        assert_eq!(sub.price("AAPL", d(2020, 1, 3)), Some(101.0));
        assert_eq!(sub.dividend("AAPL", d(2020, 1, 3)), Some(0.5));
        assert!(sub.price("GOOG", d(2020, 1, 6)).is_none());
    }

    #[test]
    fn query_fails_loudly_on_missing_coverage() {
        let snap = sample();
        let err = snap
            .query(&["AAPL", "TSLA"], d(2020, 1, 2), d(2020, 1, 6))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoCoverage { ref ticker, .. } if ticker == "TSLA"));

        // Also fails when the ticker exists but has nothing in range.
        let err = snap.query(&["GOOG"], d(2021, 1, 1), d(2021, 2, 1)).unwrap_err();
        assert!(matches!(err, ConfigError::NoCoverage { .. }));
    }

    #[test]
    fn dividend_lookup() {
        let snap = sample();
        assert_eq!(snap.dividend("AAPL", d(2020, 1, 3)), Some(0.5));
        assert_eq!(snap.dividend("AAPL", d(2020, 1, 2)), None);
        assert_eq!(snap.dividend("GOOG", d(2020, 1, 2)), None);
    }
}
