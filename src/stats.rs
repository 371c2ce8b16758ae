use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fixed-length lookback window for completion-rate statistics.
/// Day counts are fixed (7/30/365), not calendar-aware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }

    pub fn expected_days(&self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Year => 365,
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            _ => Err("Period must be one of: week, month, year".to_string()),
        }
    }
}

/// Derived statistics for one habit over one period window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitStats {
    pub completed_days: usize,
    pub expected_days: i64,
    pub completion_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completions: usize,
}

/// Map a period to its window start (`today - N days`) and expected day count.
pub fn period_window(period: Period, today: NaiveDate) -> (NaiveDate, i64) {
    let expected = period.expected_days();
    let start = today - Days::new(expected as u64);
    (start, expected)
}

/// Percentage of expected days with a completion, rounded to 2 decimals.
///
/// Counts dates on or after `start_date`. A zero `expected_days` yields 0
/// rather than dividing.
pub fn completion_rate(dates: &[NaiveDate], start_date: NaiveDate, expected_days: i64) -> f64 {
    if expected_days <= 0 {
        return 0.0;
    }
    let completed = dates.iter().filter(|d| **d >= start_date).count();
    let rate = (completed as f64 / expected_days as f64) * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Count of dates within the window (on or after `start_date`).
pub fn completed_days(dates: &[NaiveDate], start_date: NaiveDate) -> usize {
    dates.iter().filter(|d| **d >= start_date).count()
}

/// Consecutive completed days ending at `today`, walking backward.
///
/// The walk stops at the first gap: if `today` itself has no completion the
/// streak is 0, regardless of any earlier run. Dates later than the date
/// currently being checked are skipped, which also makes duplicate dates
/// no-ops. Single pass over the dates sorted descending.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut sorted: Vec<NaiveDate> = dates.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let mut streak = 0u32;
    let mut check_date = today;

    for date in sorted {
        if date == check_date {
            streak += 1;
            check_date = check_date.pred_opt().unwrap_or(check_date);
        } else if date < check_date {
            break;
        }
        // date > check_date: already consumed or in the future, skip
    }

    streak
}

/// Longest run of consecutive calendar days anywhere in the history.
///
/// Ascending scan: the running streak grows when a date is exactly one day
/// after the previous, resets to 1 on a gap, and ignores duplicates.
pub fn longest_streak(dates: &[NaiveDate]) -> u32 {
    let mut sorted: Vec<NaiveDate> = dates.to_vec();
    sorted.sort_unstable();

    let mut longest = 0u32;
    let mut running = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for date in sorted {
        match prev {
            Some(p) if date == p => continue,
            Some(p) if p.succ_opt() == Some(date) => running += 1,
            _ => running = 1,
        }
        longest = longest.max(running);
        prev = Some(date);
    }

    longest
}
