//! CSV ingestion and synthetic fixtures for the runner.
//!
//! A data directory holds `prices.csv` (ticker, date, adjusted_close) and an
//! optional `dividends.csv` (ticker, date, amount_per_share). Acquisition
//! and cleaning of those files is the upstream collaborator's job; loading
//! here is strict — a malformed row fails the load, never gets skipped.
//!
//! Synthetic generation is a developer-only path for demos and fixtures:
//! seeded, so identical seeds produce identical series.

use chrono::{Datelike, NaiveDate, Weekday};
use folioback_core::data::{AssetPrice, DividendEvent, MarketSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("'{}' contains no price rows", path.display())]
    Empty { path: PathBuf },
}

/// Load a market snapshot from a data directory.
///
/// `prices.csv` is required; `dividends.csv` is optional and its absence
/// means "no dividends", not an error.
pub fn load_market(dir: &Path) -> Result<MarketSnapshot, LoadError> {
    let prices_path = dir.join("prices.csv");
    let prices: Vec<AssetPrice> = read_rows(&prices_path)?;
    if prices.is_empty() {
        return Err(LoadError::Empty { path: prices_path });
    }

    let dividends_path = dir.join("dividends.csv");
    let dividends: Vec<DividendEvent> = if dividends_path.exists() {
        read_rows(&dividends_path)?
    } else {
        Vec::new()
    };

    log::info!(
        "loaded {} price rows, {} dividend rows from {}",
        prices.len(),
        dividends.len(),
        dir.display()
    );
    Ok(MarketSnapshot::from_events(prices, dividends))
}

/// Write a snapshot back out as `prices.csv` (+ `dividends.csv` when any
/// dividends exist), in a stable row order.
pub fn write_market(dir: &Path, market: &MarketSnapshot) -> Result<(), LoadError> {
    std::fs::create_dir_all(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    write_rows(&dir.join("prices.csv"), &market.price_events())?;
    let dividends = market.dividend_events();
    if !dividends.is_empty() {
        write_rows(&dir.join("dividends.csv"), &dividends)?;
    }
    Ok(())
}

/// Parameters for seeded synthetic series.
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub trading_days: usize,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            tickers: vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()],
            start: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default(),
            trading_days: 504,
            seed: 42,
        }
    }
}

/// Generate a synthetic market: a weekday random walk per ticker plus a
/// small quarterly dividend. Deterministic for a given spec.
pub fn generate_synthetic(spec: &SyntheticSpec) -> MarketSnapshot {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut prices = Vec::new();
    let mut dividends = Vec::new();

    for ticker in &spec.tickers {
        let mut price: f64 = rng.gen_range(40.0..400.0);
        let drift = rng.gen_range(-0.0002..0.0006);
        let vol = rng.gen_range(0.005..0.02);
        let mut date = spec.start;
        let mut quarter = quarter_of(date);
        let mut produced = 0;
        while produced < spec.trading_days {
            if !is_weekend(date) {
                price *= 1.0 + drift + vol * rng.gen_range(-1.0..1.0);
                price = price.max(1.0);
                prices.push(AssetPrice {
                    ticker: ticker.clone(),
                    date,
                    adjusted_close: (price * 100.0).round() / 100.0,
                });
                if quarter_of(date) != quarter {
                    quarter = quarter_of(date);
                    dividends.push(DividendEvent {
                        ticker: ticker.clone(),
                        date,
                        amount_per_share: (price * 0.004 * 100.0).round() / 100.0,
                    });
                }
                produced += 1;
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
    }
    MarketSnapshot::from_events(prices, dividends)
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<(), LoadError> {
    let file = File::create(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row).map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    }
    writer.flush().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn quarter_of(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month0() / 3)
}
