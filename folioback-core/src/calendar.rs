//! Trading calendar generator.
//!
//! Builds the ordered sequence of simulated days for a run and flags which of
//! them trigger a rebalance and which receive a recurring contribution. For
//! period cadences the trigger is the first trading day on or after each
//! period boundary: Monday for weekly, the 1st for monthly, quarter starts
//! (Jan/Apr/Jul/Oct 1) for quarterly, Jan 1 for yearly.

use crate::domain::Frequency;
use crate::error::ConfigError;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;

/// One simulated trading day with its scheduling flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimDay {
    pub date: NaiveDate,
    pub is_rebalance_day: bool,
    pub is_contribution_day: bool,
}

/// The full, ascending day sequence for a run.
#[derive(Debug, Clone)]
pub struct SimCalendar {
    days: Vec<SimDay>,
}

impl SimCalendar {
    /// Build the calendar for `[start, end]` over the given trading dates.
    ///
    /// The first trading day is the implicit funding day and is never flagged
    /// as a rebalance day — there is nothing to rebalance yet.
    pub fn build(
        start: NaiveDate,
        end: NaiveDate,
        rebalance: Frequency,
        contribution: Frequency,
        trading_dates: &BTreeSet<NaiveDate>,
    ) -> Result<Self, ConfigError> {
        if start >= end {
            return Err(ConfigError::InvalidDateRange { start, end });
        }

        let in_range: Vec<NaiveDate> = trading_dates
            .range(start..=end)
            .copied()
            .collect();
        let first_day = match in_range.first() {
            Some(&d) => d,
            None => return Err(ConfigError::NoTradingDays { start, end }),
        };

        let rebalance_days = trigger_days(rebalance, start, end, &in_range, first_day);
        let contribution_days = trigger_days(contribution, start, end, &in_range, first_day);

        let days = in_range
            .into_iter()
            .map(|date| SimDay {
                date,
                is_rebalance_day: rebalance_days.contains(&date),
                is_contribution_day: contribution_days.contains(&date),
            })
            .collect();
        Ok(Self { days })
    }

    pub fn days(&self) -> &[SimDay] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.days[self.days.len() - 1].date
    }
}

/// Map a cadence onto concrete trading days.
///
/// `Daily` flags every trading day after the funding day. Period cadences
/// flag, for each period boundary strictly after `start`, the first trading
/// day on or after that boundary. Two boundaries falling into the same data
/// gap collapse onto one trading day.
fn trigger_days(
    freq: Frequency,
    start: NaiveDate,
    end: NaiveDate,
    trading_days: &[NaiveDate],
    first_day: NaiveDate,
) -> BTreeSet<NaiveDate> {
    match freq {
        Frequency::Never => BTreeSet::new(),
        Frequency::Daily => trading_days
            .iter()
            .copied()
            .filter(|&d| d > first_day)
            .collect(),
        _ => period_boundaries(freq, start, end)
            .into_iter()
            .filter_map(|boundary| first_trading_day_on_or_after(trading_days, boundary))
            .filter(|&d| d > first_day)
            .collect(),
    }
}

fn first_trading_day_on_or_after(trading_days: &[NaiveDate], target: NaiveDate) -> Option<NaiveDate> {
    let idx = trading_days.partition_point(|&d| d < target);
    trading_days.get(idx).copied()
}

/// Period boundaries strictly after `start`, up to and including `end`.
fn period_boundaries(freq: Frequency, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut boundaries = Vec::new();
    let mut current = match freq {
        Frequency::Weekly => {
            // Next Monday strictly after start.
            let offset = (7 - start.weekday().num_days_from_monday()) % 7;
            let candidate = start + Duration::days(offset as i64);
            if candidate > start {
                candidate
            } else {
                candidate + Duration::days(7)
            }
        }
        Frequency::Monthly => first_of_next_month(start),
        Frequency::Quarterly => {
            // Next quarter start (Jan/Apr/Jul/Oct 1) strictly after start.
            let mut b = first_of_next_month(start);
            while (b.month() - 1) % 3 != 0 {
                b = first_of_next_month(b);
            }
            b
        }
        Frequency::Yearly => NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
            .expect("Jan 1 is always a valid date"),
        Frequency::Never | Frequency::Daily => return boundaries,
    };

    while current <= end {
        boundaries.push(current);
        current = match freq {
            Frequency::Weekly => current + Duration::days(7),
            Frequency::Monthly => first_of_next_month(current),
            Frequency::Quarterly => {
                let mut b = first_of_next_month(current);
                b = first_of_next_month(b);
                first_of_next_month(b)
            }
            Frequency::Yearly => NaiveDate::from_ymd_opt(current.year() + 1, 1, 1)
                .expect("Jan 1 is always a valid date"),
            Frequency::Never | Frequency::Daily => unreachable!(),
        };
    }
    boundaries
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is always valid")
}
