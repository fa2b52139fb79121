//! Market data snapshot consumed by the simulation loop.
//!
//! Acquisition and normalization of raw series (download, caching, currency
//! conversion) live upstream; the engine only ever sees an immutable
//! [`MarketSnapshot`] built from already-clean data.

pub mod series;

pub use series::{AssetPrice, DividendEvent, MarketSnapshot};
