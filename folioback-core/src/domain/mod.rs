//! Domain types: allocations, strategy, portfolio state, equity curve.

pub mod allocation;
pub mod curve;
pub mod portfolio;
pub mod strategy;

pub use allocation::TargetAllocation;
pub use curve::{EquityCurvePoint, PositionSnapshot};
pub use portfolio::PortfolioState;
pub use strategy::{
    Frequency, Mode, RecurringContribution, ResolvedStrategy, StrategyConfig,
};
