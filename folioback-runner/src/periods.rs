//! Period-return aggregation: bucket daily net returns into calendar
//! periods and compound them.
//!
//! A period's return is `Π(1 + r_t) − 1` over the net daily returns of the
//! trading days that fall inside it. Partial periods at the edges of the
//! run are reported as-is, not annualized.

use chrono::{Datelike, NaiveDate};
use folioback_core::domain::EquityCurvePoint;
use serde::{Deserialize, Serialize};

use crate::metrics::net_daily_returns;

/// Reporting granularity for period returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Quarterly,
        Granularity::Yearly,
    ];
}

/// Compounded return of one calendar period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReturn {
    /// Human-readable period key: `2024-03-08`, `2024-W10`, `2024-03`,
    /// `2024-Q1`, or `2024`.
    pub period: String,
    /// First trading date of the period within the run.
    pub period_start: NaiveDate,
    /// Compounded net return as a fraction.
    pub value: f64,
}

/// Win/lose breakdown over monthly returns. A flat month counts as a win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyWinLose {
    pub winning_months: usize,
    pub losing_months: usize,
    /// `winning / (winning + losing)`, 0.0 when there are no months.
    pub win_rate: f64,
}

/// One bucket of the monthly-returns histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub label: String,
    pub count: usize,
}

/// Compound daily net returns into periods of the given granularity.
///
/// Output is in chronological order. The funding day itself carries no
/// return, so a run's first period may span fewer trading days than the
/// calendar period.
pub fn period_returns(curve: &[EquityCurvePoint], granularity: Granularity) -> Vec<PeriodReturn> {
    let returns = net_daily_returns(curve);
    let mut out: Vec<PeriodReturn> = Vec::new();
    for (i, r) in returns.iter().enumerate() {
        // returns[i] is the return earned on curve[i + 1].date.
        let date = curve[i + 1].date;
        let key = period_key(date, granularity);
        match out.last_mut() {
            Some(last) if last.period == key => {
                last.value = (1.0 + last.value) * (1.0 + r) - 1.0;
            }
            _ => out.push(PeriodReturn {
                period: key,
                period_start: date,
                value: *r,
            }),
        }
    }
    out
}

/// The highest-return period, `None` for an empty list.
pub fn best_period(returns: &[PeriodReturn]) -> Option<&PeriodReturn> {
    returns
        .iter()
        .max_by(|a, b| a.value.total_cmp(&b.value))
}

/// The lowest-return period, `None` for an empty list.
pub fn worst_period(returns: &[PeriodReturn]) -> Option<&PeriodReturn> {
    returns
        .iter()
        .min_by(|a, b| a.value.total_cmp(&b.value))
}

/// Count winning (return ≥ 0) and losing months.
pub fn monthly_win_lose(monthly: &[PeriodReturn]) -> MonthlyWinLose {
    let winning_months = monthly.iter().filter(|p| p.value >= 0.0).count();
    let losing_months = monthly.len() - winning_months;
    let win_rate = if monthly.is_empty() {
        0.0
    } else {
        winning_months as f64 / monthly.len() as f64
    };
    MonthlyWinLose {
        winning_months,
        losing_months,
        win_rate,
    }
}

const HISTOGRAM_LABELS: [&str; 6] = [
    "< -10%",
    "-10% to -5%",
    "-5% to 0%",
    "0% to 5%",
    "5% to 10%",
    "10%+",
];

/// Bucket monthly returns into the fixed histogram bands.
///
/// All six buckets are always present, zero counts included, so chart
/// consumers get a stable shape.
pub fn monthly_histogram(monthly: &[PeriodReturn]) -> Vec<HistogramBucket> {
    let mut counts = [0usize; 6];
    for period in monthly {
        let idx = match period.value {
            v if v < -0.10 => 0,
            v if v < -0.05 => 1,
            v if v < 0.0 => 2,
            v if v < 0.05 => 3,
            v if v < 0.10 => 4,
            _ => 5,
        };
        counts[idx] += 1;
    }
    HISTOGRAM_LABELS
        .iter()
        .zip(counts)
        .map(|(label, count)| HistogramBucket {
            label: label.to_string(),
            count,
        })
        .collect()
}

fn period_key(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Daily => date.format("%Y-%m-%d").to_string(),
        Granularity::Weekly => {
            let iso = date.iso_week();
            format!("{}-W{:02}", iso.year(), iso.week())
        }
        Granularity::Monthly => date.format("%Y-%m").to_string(),
        Granularity::Quarterly => {
            format!("{}-Q{}", date.year(), (date.month0() / 3) + 1)
        }
        Granularity::Yearly => date.format("%Y").to_string(),
    }
}
