//! Simulation engine — the day-by-day portfolio state machine.
//!
//! Per trading day, in fixed order:
//! 1. Mark holdings to the day's adjusted close
//! 2. Apply dividends (reinvest or credit cash)
//! 3. Apply a recurring contribution if scheduled
//! 4. Invest/rebalance through the transaction resolver
//! 5. Append one equity curve point

pub mod resolver;
pub mod sim_loop;
pub mod state;

pub use resolver::{TargetWeightResolver, TradeDelta, TradePlan, TransactionResolver};
pub use sim_loop::run_simulation;
pub use state::{EngineConfig, GapPolicy, SimulationOutput};
