//! FolioBack Core — portfolio simulation engine and domain types.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (target allocation, strategy, portfolio state, equity curve)
//! - Market snapshot (adjusted closes and dividend events, date-indexed)
//! - Simulation calendar (trading days, rebalance and contribution triggers)
//! - Daily state machine with a fixed five-step per-day order
//! - Transaction resolver trait with the standard target-weight policy
//!
//! The metrics and reporting layers live in `folioback-runner`; this crate
//! only produces the equity curve.

pub mod calendar;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
