//! FolioBack Runner — backtest orchestration, metrics, reports, jobs.
//!
//! This crate builds on `folioback-core` to provide:
//! - TOML-serializable config with validation and content-hash run IDs
//! - CSV data loading and seeded synthetic fixtures
//! - Pure-function performance metrics and period-return aggregation
//! - Report assembly with chart-shaped series
//! - JSON/CSV export with schema versioning
//! - Parallel batch runs and a background job store

pub mod config;
pub mod data_loader;
pub mod export;
pub mod jobs;
pub mod metrics;
pub mod periods;
pub mod result;
pub mod runner;

pub use config::{BacktestConfig, BacktestSection, ContributionSection, RunId, StrategySection};
pub use data_loader::{generate_synthetic, load_market, write_market, LoadError, SyntheticSpec};
pub use export::{export_equity_csv, export_json, import_json, write_artifacts};
pub use jobs::{JobId, JobStatus, JobStore};
pub use metrics::{DrawdownReport, PerformanceMetrics};
pub use periods::{Granularity, HistogramBucket, MonthlyWinLose, PeriodReturn};
pub use result::{assemble_report, BacktestReport, ChartData, SCHEMA_VERSION};
pub use runner::{run_backtest, run_batch, RunError};
