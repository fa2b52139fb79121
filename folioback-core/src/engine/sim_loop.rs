//! The daily state machine. Advances a portfolio through the simulation
//! calendar in a fixed per-day order:
//!
//! 1. mark holdings to market
//! 2. credit dividends (reinvest or hold as cash)
//! 3. apply scheduled cash inflows
//! 4. invoke the resolver on funding / rebalance days
//! 5. append the equity curve point
//!
//! Changing this order changes results, so it is pinned here and nowhere
//! else.

use crate::calendar::SimCalendar;
use crate::data::MarketSnapshot;
use crate::domain::{EquityCurvePoint, PortfolioState, PositionSnapshot};
use crate::engine::resolver::TransactionResolver;
use crate::engine::state::{EngineConfig, GapPolicy, SimulationOutput};
use crate::error::EngineError;
use chrono::NaiveDate;
use log::{debug, trace};
use std::collections::HashMap;

/// Run one simulation over a pre-built calendar and market snapshot.
///
/// Fails loudly: any unresolvable price (per the gap policy) or invalid
/// configuration aborts the run with no partial output.
pub fn run_simulation(
    config: &EngineConfig,
    calendar: &SimCalendar,
    market: &MarketSnapshot,
    resolver: &dyn TransactionResolver,
) -> Result<SimulationOutput, EngineError> {
    config.validate()?;

    let first_day = calendar.first_date();
    let mut portfolio = PortfolioState::new();
    let mut equity_curve = Vec::with_capacity(calendar.len());
    let mut cumulative_contributions = 0.0;
    let mut rebalance_count = 0usize;
    let mut dividend_income = 0.0;
    let mut prices: HashMap<String, f64> = HashMap::new();

    for day in calendar.days() {
        // 1. Mark to market. Held tickers need a usable price today; the
        // gap policy decides whether a stale close is acceptable.
        prices.clear();
        for ticker in portfolio.holdings.keys() {
            let price = valuation_price(market, ticker, day.date, config.gap_policy)?;
            prices.insert(ticker.clone(), price);
        }

        // 2. Dividends. Reinvestment is a trade and therefore needs a live
        // price regardless of gap policy.
        let held: Vec<(String, f64)> = portfolio
            .holdings
            .iter()
            .map(|(t, s)| (t.clone(), *s))
            .collect();
        for (ticker, shares) in held {
            let Some(per_share) = market.dividend(&ticker, day.date) else {
                continue;
            };
            let cash = shares * per_share;
            dividend_income += cash;
            if config.strategy.reinvest_dividends {
                let price = market.price(&ticker, day.date).ok_or_else(|| {
                    EngineError::MissingPriceData {
                        ticker: ticker.clone(),
                        date: day.date,
                    }
                })?;
                let bought = if config.strategy.fractional_shares {
                    cash / price
                } else {
                    (cash / price).floor()
                };
                portfolio.adjust_shares(&ticker, bought);
                portfolio.add_cash(cash - bought * price);
                prices.insert(ticker, price);
            } else {
                portfolio.add_cash(cash);
            }
        }

        // 3. Cash inflows. The first trading day carries the initial
        // investment; contribution days add the recurring amount.
        let mut inflow = 0.0;
        if day.date == first_day {
            inflow += config.initial_investment;
        }
        if day.is_contribution_day {
            if let Some(contribution) = &config.contribution {
                inflow += contribution.amount;
            }
        }
        if inflow > 0.0 {
            portfolio.add_cash(inflow);
            cumulative_contributions += inflow;
        }

        // 4. Resolve trades. A rebalance subsumes investing the day's
        // inflow, so a day that is both only rebalances.
        if day.is_rebalance_day {
            require_live_prices(market, &portfolio, config, day.date, &mut prices)?;
            let plan = resolver.rebalance(&portfolio, &prices, &config.allocation)?;
            if !plan.is_empty() {
                debug!(
                    "{}: rebalance, {} trades, cash after {:.2}",
                    day.date,
                    plan.deltas.len(),
                    plan.cash_after
                );
                plan.apply(&mut portfolio);
                rebalance_count += 1;
            }
        } else if inflow > 0.0 {
            require_live_prices(market, &portfolio, config, day.date, &mut prices)?;
            let plan = resolver.invest_cash(&portfolio, &prices, &config.allocation)?;
            if !plan.is_empty() {
                debug!(
                    "{}: invest {:.2} of cash, {} buys",
                    day.date, inflow, plan.deltas.len()
                );
                plan.apply(&mut portfolio);
            }
        }

        // 5. Append the curve point. Every held ticker has a price in the
        // map by now: carried over from step 1 or set live by a trade.
        debug_assert!(portfolio
            .holdings
            .keys()
            .all(|t| prices.contains_key(t)));
        let total_value = portfolio.total_value(&prices);
        let positions = snapshot_positions(&portfolio, &prices, total_value);
        debug_assert!(
            (total_value - portfolio.cash - positions.iter().map(|p| p.value).sum::<f64>())
                .abs()
                < 1e-6
        );
        trace!("{}: total {:.2}, cash {:.2}", day.date, total_value, portfolio.cash);
        equity_curve.push(EquityCurvePoint {
            date: day.date,
            total_value,
            cash: portfolio.cash,
            cash_inflow: inflow,
            cumulative_contributions,
            positions,
        });
    }

    let final_value = equity_curve
        .last()
        .map(|p| p.total_value)
        .unwrap_or(0.0);
    Ok(SimulationOutput {
        equity_curve,
        final_value,
        total_contributions: cumulative_contributions,
        rebalance_count,
        dividend_income,
    })
}

fn valuation_price(
    market: &MarketSnapshot,
    ticker: &str,
    date: NaiveDate,
    policy: GapPolicy,
) -> Result<f64, EngineError> {
    if let Some(price) = market.price(ticker, date) {
        return Ok(price);
    }
    match policy {
        GapPolicy::CarryForward => market
            .last_price_on_or_before(ticker, date)
            .ok_or_else(|| EngineError::MissingPriceData {
                ticker: ticker.to_string(),
                date,
            }),
        GapPolicy::Fail => Err(EngineError::MissingPriceData {
            ticker: ticker.to_string(),
            date,
        }),
    }
}

/// Insist on a live close for every ticker a trade could touch today:
/// the full target allocation plus everything currently held.
fn require_live_prices(
    market: &MarketSnapshot,
    portfolio: &PortfolioState,
    config: &EngineConfig,
    date: NaiveDate,
    prices: &mut HashMap<String, f64>,
) -> Result<(), EngineError> {
    let tickers: Vec<String> = config
        .allocation
        .tickers()
        .map(str::to_string)
        .chain(portfolio.holdings.keys().cloned())
        .collect();
    for ticker in tickers {
        let price = market
            .price(&ticker, date)
            .ok_or_else(|| EngineError::MissingPriceData {
                ticker: ticker.clone(),
                date,
            })?;
        prices.insert(ticker, price);
    }
    Ok(())
}

fn snapshot_positions(
    portfolio: &PortfolioState,
    prices: &HashMap<String, f64>,
    total_value: f64,
) -> Vec<PositionSnapshot> {
    portfolio
        .holdings
        .iter()
        .map(|(ticker, &shares)| {
            let price = prices.get(ticker).copied().unwrap_or(0.0);
            let value = shares * price;
            PositionSnapshot {
                ticker: ticker.clone(),
                shares,
                price,
                value,
                weight: if total_value > 0.0 { value / total_value } else { 0.0 },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::SimCalendar;
    use crate::data::{AssetPrice, DividendEvent};
    use crate::domain::{
        Frequency, Mode, RecurringContribution, StrategyConfig, TargetAllocation,
    };
    use crate::engine::resolver::TargetWeightResolver;
    use std::collections::BTreeMap;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn row(ticker: &str, date: &str, close: f64) -> AssetPrice {
        AssetPrice {
            ticker: ticker.to_string(),
            date: d(date),
            adjusted_close: close,
        }
    }

    fn allocation(pairs: &[(&str, f64)]) -> TargetAllocation {
        let raw: BTreeMap<String, f64> =
            pairs.iter().map(|(t, w)| (t.to_string(), *w)).collect();
        TargetAllocation::new(raw).unwrap()
    }

    fn config(initial: f64, alloc: TargetAllocation) -> EngineConfig {
        EngineConfig {
            initial_investment: initial,
            allocation: alloc,
            strategy: StrategyConfig::default().resolve(Mode::Basic),
            contribution: None,
            gap_policy: GapPolicy::Fail,
        }
    }

    fn run(
        cfg: &EngineConfig,
        market: &MarketSnapshot,
        start: &str,
        end: &str,
    ) -> SimulationOutput {
        let contribution_freq = cfg
            .contribution
            .map(|c| c.frequency)
            .unwrap_or(Frequency::Never);
        let calendar = SimCalendar::build(
            d(start),
            d(end),
            cfg.strategy.rebalance_frequency,
            contribution_freq,
            &market.trading_dates(),
        )
        .unwrap();
        let resolver = TargetWeightResolver::new(cfg.strategy.fractional_shares);
        run_simulation(cfg, &calendar, market, &resolver).unwrap()
    }

    #[test]
    fn lump_sum_tracks_price_exactly_with_fractional_shares() {
        let market = MarketSnapshot::from_events(
            vec![
                row("SPY", "2024-01-02", 100.0),
                row("SPY", "2024-01-03", 110.0),
                row("SPY", "2024-01-04", 99.0),
            ],
            vec![],
        );
        let cfg = config(10_000.0, allocation(&[("SPY", 1.0)]));
        let out = run(&cfg, &market, "2024-01-01", "2024-01-05");

        assert_eq!(out.equity_curve.len(), 3);
        assert!((out.equity_curve[0].total_value - 10_000.0).abs() < 1e-9);
        assert!((out.equity_curve[1].total_value - 11_000.0).abs() < 1e-9);
        assert!((out.final_value - 9_900.0).abs() < 1e-9);
        assert!((out.total_contributions - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn whole_shares_leave_cash_drag() {
        let market = MarketSnapshot::from_events(
            vec![row("SPY", "2024-01-02", 300.0), row("SPY", "2024-01-03", 300.0)],
            vec![],
        );
        let mut cfg = config(1_000.0, allocation(&[("SPY", 1.0)]));
        cfg.strategy = StrategyConfig {
            fractional_shares: false,
            reinvest_dividends: true,
            rebalance_frequency: Frequency::Never,
        }
        .resolve(Mode::Realistic);
        let out = run(&cfg, &market, "2024-01-01", "2024-01-04");

        // 3 whole shares at 300, 100 left in cash.
        let point = &out.equity_curve[0];
        assert!((point.cash - 100.0).abs() < 1e-9);
        assert!((point.total_value - 1_000.0).abs() < 1e-9);
        assert!((point.positions[0].shares - 3.0).abs() < 1e-12);
    }

    #[test]
    fn reinvested_dividend_buys_shares_without_touching_cash() {
        // 100 shares at $10, $1/share dividend: reinvest buys 10 more.
        let market = MarketSnapshot::from_events(
            vec![
                row("VTI", "2024-01-02", 10.0),
                row("VTI", "2024-01-03", 10.0),
            ],
            vec![DividendEvent {
                ticker: "VTI".to_string(),
                date: d("2024-01-03"),
                amount_per_share: 1.0,
            }],
        );
        let cfg = config(1_000.0, allocation(&[("VTI", 1.0)]));
        let out = run(&cfg, &market, "2024-01-01", "2024-01-04");

        let last = out.equity_curve.last().unwrap();
        assert!((last.positions[0].shares - 110.0).abs() < 1e-9);
        assert!(last.cash.abs() < 1e-9);
        assert!((out.dividend_income - 100.0).abs() < 1e-9);
    }

    #[test]
    fn unreinvested_dividend_accumulates_as_cash() {
        let market = MarketSnapshot::from_events(
            vec![
                row("VTI", "2024-01-02", 10.0),
                row("VTI", "2024-01-03", 10.0),
            ],
            vec![DividendEvent {
                ticker: "VTI".to_string(),
                date: d("2024-01-03"),
                amount_per_share: 1.0,
            }],
        );
        let mut cfg = config(1_000.0, allocation(&[("VTI", 1.0)]));
        cfg.strategy = StrategyConfig {
            fractional_shares: true,
            reinvest_dividends: false,
            rebalance_frequency: Frequency::Never,
        }
        .resolve(Mode::Realistic);
        let out = run(&cfg, &market, "2024-01-01", "2024-01-04");

        let last = out.equity_curve.last().unwrap();
        assert!((last.positions[0].shares - 100.0).abs() < 1e-9);
        assert!((last.cash - 100.0).abs() < 1e-9);
        assert!((last.total_value - 1_100.0).abs() < 1e-9);
    }

    #[test]
    fn shares_stay_constant_without_rebalancing() {
        // Two tickers drifting apart; Never rebalance means share counts
        // are frozen after the funding day.
        let market = MarketSnapshot::from_events(
            vec![
                row("A", "2024-01-02", 100.0),
                row("B", "2024-01-02", 50.0),
                row("A", "2024-01-03", 150.0),
                row("B", "2024-01-03", 40.0),
                row("A", "2024-01-04", 200.0),
                row("B", "2024-01-04", 30.0),
            ],
            vec![],
        );
        let cfg = config(10_000.0, allocation(&[("A", 0.5), ("B", 0.5)]));
        let out = run(&cfg, &market, "2024-01-01", "2024-01-05");

        let first = &out.equity_curve[0];
        for point in &out.equity_curve[1..] {
            for (a, b) in point.positions.iter().zip(&first.positions) {
                assert_eq!(a.ticker, b.ticker);
                assert!((a.shares - b.shares).abs() < 1e-12);
            }
        }
        assert_eq!(out.rebalance_count, 0);
    }

    #[test]
    fn monthly_rebalance_restores_target_weights() {
        let mut rows = Vec::new();
        // January: A doubles while B is flat, so weights drift to 2:1.
        for (date, a, b) in [
            ("2024-01-02", 100.0, 100.0),
            ("2024-01-16", 150.0, 100.0),
            ("2024-01-31", 200.0, 100.0),
            ("2024-02-01", 200.0, 100.0),
            ("2024-02-02", 200.0, 100.0),
        ] {
            rows.push(row("A", date, a));
            rows.push(row("B", date, b));
        }
        let market = MarketSnapshot::from_events(rows, vec![]);
        let mut cfg = config(10_000.0, allocation(&[("A", 0.5), ("B", 0.5)]));
        cfg.strategy = StrategyConfig {
            fractional_shares: true,
            reinvest_dividends: true,
            rebalance_frequency: Frequency::Monthly,
        }
        .resolve(Mode::Basic);
        let out = run(&cfg, &market, "2024-01-01", "2024-02-03");

        assert_eq!(out.rebalance_count, 1);
        // Feb 1 is the first trading day on or after the month boundary.
        let feb1 = out
            .equity_curve
            .iter()
            .find(|p| p.date == d("2024-02-01"))
            .unwrap();
        for position in &feb1.positions {
            assert!((position.weight - 0.5).abs() < 1e-9, "{position:?}");
        }
    }

    #[test]
    fn contributions_are_invested_and_tracked() {
        let mut rows = Vec::new();
        let mut date = d("2024-01-02");
        while date < d("2024-03-15") {
            rows.push(AssetPrice {
                ticker: "SPY".to_string(),
                date,
                adjusted_close: 100.0,
            });
            date = date.succ_opt().unwrap();
        }
        let market = MarketSnapshot::from_events(rows, vec![]);
        let mut cfg = config(10_000.0, allocation(&[("SPY", 1.0)]));
        cfg.contribution = Some(RecurringContribution {
            amount: 500.0,
            frequency: Frequency::Monthly,
        });
        let out = run(&cfg, &market, "2024-01-01", "2024-03-15");

        // Feb 1 and Mar 1 contributions on a flat price.
        assert!((out.total_contributions - 11_000.0).abs() < 1e-9);
        assert!((out.final_value - 11_000.0).abs() < 1e-9);
        let feb1 = out
            .equity_curve
            .iter()
            .find(|p| p.date == d("2024-02-01"))
            .unwrap();
        assert!((feb1.cash_inflow - 500.0).abs() < 1e-9);
        assert!(feb1.cash.abs() < 1e-9, "inflow is invested same day");
    }

    #[test]
    fn gap_fails_by_default_and_carries_forward_when_asked() {
        // B skips Jan 3 while A trades.
        let market = MarketSnapshot::from_events(
            vec![
                row("A", "2024-01-02", 100.0),
                row("B", "2024-01-02", 50.0),
                row("A", "2024-01-03", 110.0),
                row("A", "2024-01-04", 110.0),
                row("B", "2024-01-04", 50.0),
            ],
            vec![],
        );
        let cfg = config(10_000.0, allocation(&[("A", 0.5), ("B", 0.5)]));
        let calendar = SimCalendar::build(
            d("2024-01-01"),
            d("2024-01-05"),
            Frequency::Never,
            Frequency::Never,
            &market.trading_dates(),
        )
        .unwrap();
        let resolver = TargetWeightResolver::new(true);

        let err = run_simulation(&cfg, &calendar, &market, &resolver).unwrap_err();
        assert!(matches!(err, EngineError::MissingPriceData { .. }));

        let mut carry = cfg.clone();
        carry.gap_policy = GapPolicy::CarryForward;
        let out = run_simulation(&carry, &calendar, &market, &resolver).unwrap();
        let jan3 = &out.equity_curve[1];
        let b = jan3.positions.iter().find(|p| p.ticker == "B").unwrap();
        assert!((b.price - 50.0).abs() < 1e-9, "valued at last seen close");
    }

    #[test]
    fn valuation_identity_holds_at_every_point() {
        let market = MarketSnapshot::from_events(
            vec![
                row("A", "2024-01-02", 100.0),
                row("B", "2024-01-02", 40.0),
                row("A", "2024-01-03", 97.0),
                row("B", "2024-01-03", 44.0),
                row("A", "2024-01-04", 103.0),
                row("B", "2024-01-04", 41.0),
            ],
            vec![],
        );
        let cfg = config(25_000.0, allocation(&[("A", 0.6), ("B", 0.4)]));
        let out = run(&cfg, &market, "2024-01-01", "2024-01-05");

        for point in &out.equity_curve {
            let holdings: f64 = point.positions.iter().map(|p| p.value).sum();
            assert!(
                (point.total_value - point.cash - holdings).abs() < 1e-6,
                "identity broken at {}",
                point.date
            );
        }
    }

    #[test]
    fn empty_calendar_is_rejected_upstream() {
        let market = MarketSnapshot::from_events(vec![row("A", "2024-06-01", 1.0)], vec![]);
        let result = SimCalendar::build(
            d("2024-01-01"),
            d("2024-02-01"),
            Frequency::Never,
            Frequency::Never,
            &market.trading_dates(),
        );
        assert!(result.is_err());
    }
}
