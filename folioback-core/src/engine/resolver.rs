//! Transaction resolver — turns a target allocation into share deltas.
//!
//! The resolver is a trait so alternative trade policies (per-trade costs,
//! order-size restrictions) can be slotted in without touching the engine
//! loop. The standard implementation trades frictionlessly at the day's
//! adjusted close.

use crate::domain::{PortfolioState, TargetAllocation};
use crate::error::EngineError;
use std::collections::HashMap;

/// One buy (positive shares) or sell (negative shares) at a known price.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeDelta {
    pub ticker: String,
    pub shares: f64,
    pub price: f64,
}

/// The atomic outcome of a resolver invocation.
///
/// `cash_after` is authoritative: applying the plan sets cash to it rather
/// than summing trade legs, so no value is created or destroyed by rounding
/// the two differently.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub deltas: Vec<TradeDelta>,
    pub cash_after: f64,
}

impl TradePlan {
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Apply the plan to the portfolio in one step.
    pub fn apply(&self, portfolio: &mut PortfolioState) {
        for delta in &self.deltas {
            portfolio.adjust_shares(&delta.ticker, delta.shares);
        }
        portfolio.cash = self.cash_after;
        // Drop emptied positions so drift checks see a clean holdings map.
        portfolio.holdings.retain(|_, shares| shares.abs() > 1e-12);
    }
}

/// Policy seam for trade resolution.
pub trait TransactionResolver: Send + Sync {
    /// Full rebalance: drive holdings to target weights over total
    /// investable value (cash + marked-to-market holdings).
    fn rebalance(
        &self,
        portfolio: &PortfolioState,
        prices: &HashMap<String, f64>,
        allocation: &TargetAllocation,
    ) -> Result<TradePlan, EngineError>;

    /// Buy-only investment of available cash at target weights. Used on
    /// funding days; never sells existing holdings.
    fn invest_cash(
        &self,
        portfolio: &PortfolioState,
        prices: &HashMap<String, f64>,
        allocation: &TargetAllocation,
    ) -> Result<TradePlan, EngineError>;
}

/// Standard resolver: trade to target weights at the day's close.
///
/// With `fractional_shares = false` target share counts are floored and the
/// unallocated remainder stays in cash (a deliberate cash drag — it changes
/// realized returns and must not be forced into any ticker).
#[derive(Debug, Clone, Copy)]
pub struct TargetWeightResolver {
    pub fractional_shares: bool,
}

impl TargetWeightResolver {
    pub fn new(fractional_shares: bool) -> Self {
        Self { fractional_shares }
    }

    fn shares_for_value(&self, value: f64, price: f64) -> f64 {
        let exact = value / price;
        if self.fractional_shares {
            exact
        } else {
            exact.floor()
        }
    }
}

fn live_price(
    prices: &HashMap<String, f64>,
    ticker: &str,
) -> Result<f64, EngineError> {
    match prices.get(ticker) {
        Some(&p) if p > 0.0 && p.is_finite() => Ok(p),
        _ => Err(EngineError::Computation(format!(
            "no usable price for '{ticker}' at trade resolution"
        ))),
    }
}

impl TransactionResolver for TargetWeightResolver {
    fn rebalance(
        &self,
        portfolio: &PortfolioState,
        prices: &HashMap<String, f64>,
        allocation: &TargetAllocation,
    ) -> Result<TradePlan, EngineError> {
        let total_investable = portfolio.total_value(prices);
        let mut deltas = Vec::with_capacity(allocation.len());
        let mut invested = 0.0;

        for (ticker, weight) in allocation.iter() {
            let price = live_price(prices, ticker)?;
            let target_value = total_investable * weight;
            let target_shares = self.shares_for_value(target_value, price);
            invested += target_shares * price;

            let delta = target_shares - portfolio.shares(ticker);
            if delta.abs() > 1e-12 {
                deltas.push(TradeDelta {
                    ticker: ticker.to_string(),
                    shares: delta,
                    price,
                });
            }
        }

        // Liquidate anything held outside the target allocation.
        for (ticker, &shares) in &portfolio.holdings {
            if allocation.weight(ticker).is_none() && shares.abs() > 1e-12 {
                let price = live_price(prices, ticker)?;
                deltas.push(TradeDelta {
                    ticker: ticker.clone(),
                    shares: -shares,
                    price,
                });
            }
        }

        Ok(TradePlan {
            deltas,
            cash_after: total_investable - invested,
        })
    }

    fn invest_cash(
        &self,
        portfolio: &PortfolioState,
        prices: &HashMap<String, f64>,
        allocation: &TargetAllocation,
    ) -> Result<TradePlan, EngineError> {
        let budget = portfolio.cash;
        let mut deltas = Vec::with_capacity(allocation.len());
        let mut spent = 0.0;

        for (ticker, weight) in allocation.iter() {
            let price = live_price(prices, ticker)?;
            let shares = self.shares_for_value(budget * weight, price);
            if shares > 1e-12 {
                spent += shares * price;
                deltas.push(TradeDelta {
                    ticker: ticker.to_string(),
                    shares,
                    price,
                });
            }
        }

        Ok(TradePlan {
            deltas,
            cash_after: budget - spent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn allocation(pairs: &[(&str, f64)]) -> TargetAllocation {
        let raw: BTreeMap<String, f64> =
            pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect();
        TargetAllocation::new(raw).unwrap()
    }

    fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    fn funded(cash: f64) -> PortfolioState {
        let mut p = PortfolioState::new();
        p.add_cash(cash);
        p
    }

    #[test]
    fn initial_funding_fractional_hits_exact_weights() {
        let resolver = TargetWeightResolver::new(true);
        let alloc = allocation(&[("AAPL", 0.6), ("GOOG", 0.4)]);
        let p = prices(&[("AAPL", 100.0), ("GOOG", 60.0)]);
        let mut portfolio = funded(10_000.0);

        let plan = resolver.rebalance(&portfolio, &p, &alloc).unwrap();
        plan.apply(&mut portfolio);

        assert!((portfolio.shares("AAPL") - 60.0).abs() < 1e-9);
        assert!((portfolio.shares("GOOG") - 10_000.0 * 0.4 / 60.0).abs() < 1e-9);
        assert!(portfolio.cash.abs() < 1e-9);
        assert!((portfolio.total_value(&p) - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn whole_share_rounding_leaves_cash_drag() {
        let resolver = TargetWeightResolver::new(false);
        let alloc = allocation(&[("AAPL", 0.6), ("GOOG", 0.4)]);
        let p = prices(&[("AAPL", 99.0), ("GOOG", 61.0)]);
        let mut portfolio = funded(10_000.0);

        let plan = resolver.rebalance(&portfolio, &p, &alloc).unwrap();
        plan.apply(&mut portfolio);

        // 6000/99 -> 60 shares, 4000/61 -> 65 shares.
        assert_eq!(portfolio.shares("AAPL"), 60.0);
        assert_eq!(portfolio.shares("GOOG"), 65.0);
        let expected_cash = 10_000.0 - 60.0 * 99.0 - 65.0 * 61.0;
        assert!((portfolio.cash - expected_cash).abs() < 1e-9);
        assert!(portfolio.cash >= 0.0);
        // Conservation: nothing created or destroyed.
        assert!((portfolio.total_value(&p) - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn rebalance_sells_overweight_and_buys_underweight() {
        let resolver = TargetWeightResolver::new(true);
        let alloc = allocation(&[("AAPL", 0.5), ("GOOG", 0.5)]);
        let p = prices(&[("AAPL", 200.0), ("GOOG", 50.0)]);
        let mut portfolio = funded(0.0);
        portfolio.adjust_shares("AAPL", 40.0); // 8000
        portfolio.adjust_shares("GOOG", 40.0); // 2000

        let plan = resolver.rebalance(&portfolio, &p, &alloc).unwrap();
        let aapl = plan.deltas.iter().find(|d| d.ticker == "AAPL").unwrap();
        let goog = plan.deltas.iter().find(|d| d.ticker == "GOOG").unwrap();
        assert!(aapl.shares < 0.0); // sell down to 5000
        assert!(goog.shares > 0.0); // buy up to 5000

        plan.apply(&mut portfolio);
        assert!((portfolio.shares("AAPL") * 200.0 - 5_000.0).abs() < 1e-6);
        assert!((portfolio.shares("GOOG") * 50.0 - 5_000.0).abs() < 1e-6);
    }

    #[test]
    fn rebalance_liquidates_tickers_outside_allocation() {
        let resolver = TargetWeightResolver::new(true);
        let alloc = allocation(&[("AAPL", 1.0)]);
        let p = prices(&[("AAPL", 100.0), ("GOOG", 50.0)]);
        let mut portfolio = funded(0.0);
        portfolio.adjust_shares("GOOG", 10.0);

        let plan = resolver.rebalance(&portfolio, &p, &alloc).unwrap();
        plan.apply(&mut portfolio);

        assert_eq!(portfolio.shares("GOOG"), 0.0);
        assert!((portfolio.shares("AAPL") - 5.0).abs() < 1e-9);
    }

    #[test]
    fn invest_cash_never_sells() {
        let resolver = TargetWeightResolver::new(true);
        let alloc = allocation(&[("AAPL", 0.5), ("GOOG", 0.5)]);
        let p = prices(&[("AAPL", 100.0), ("GOOG", 50.0)]);
        let mut portfolio = funded(1_000.0);
        portfolio.adjust_shares("AAPL", 90.0); // heavily overweight already

        let plan = resolver.invest_cash(&portfolio, &p, &alloc).unwrap();
        assert!(plan.deltas.iter().all(|d| d.shares > 0.0));

        plan.apply(&mut portfolio);
        assert!((portfolio.shares("AAPL") - 95.0).abs() < 1e-9);
        assert!((portfolio.shares("GOOG") - 10.0).abs() < 1e-9);
        assert!(portfolio.cash.abs() < 1e-9);
    }

    #[test]
    fn missing_price_is_an_error() {
        let resolver = TargetWeightResolver::new(true);
        let alloc = allocation(&[("AAPL", 1.0)]);
        let portfolio = funded(1_000.0);
        let err = resolver
            .rebalance(&portfolio, &HashMap::new(), &alloc)
            .unwrap_err();
        assert!(matches!(err, EngineError::Computation(_)));
    }

    proptest! {
        /// Conservation under arbitrary weights/prices: a rebalance neither
        /// creates nor destroys value, fractional or not.
        #[test]
        fn rebalance_conserves_value(
            cash in 0.0..50_000.0f64,
            held_a in 0.0..200.0f64,
            held_b in 0.0..200.0f64,
            w in 0.05..0.95f64,
            price_a in 1.0..500.0f64,
            price_b in 1.0..500.0f64,
            fractional in proptest::bool::ANY,
        ) {
            let resolver = TargetWeightResolver::new(fractional);
            let alloc = allocation(&[("A", w), ("B", 1.0 - w)]);
            let p = prices(&[("A", price_a), ("B", price_b)]);
            let mut portfolio = funded(cash);
            portfolio.adjust_shares("A", held_a);
            portfolio.adjust_shares("B", held_b);
            let before = portfolio.total_value(&p);

            let plan = resolver.rebalance(&portfolio, &p, &alloc).unwrap();
            plan.apply(&mut portfolio);

            let after = portfolio.total_value(&p);
            prop_assert!((after - before).abs() < 1e-6 * before.max(1.0));
            if !fractional {
                for shares in portfolio.holdings.values() {
                    prop_assert!((shares.fract()).abs() < 1e-9);
                }
            }
        }
    }
}
