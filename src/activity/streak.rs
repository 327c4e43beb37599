//! Commit streaks over calendar dates.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Longest and current runs of consecutive commit days.
#[derive(Serialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreakResult {
    pub longest_run: u32,
    /// Most recent date of the longest run; `None` without commits
    pub longest_run_end: Option<NaiveDate>,
    pub current_run: u32,
}

impl StreakResult {
    /// First date of the longest run.
    pub fn longest_run_start(&self) -> Option<NaiveDate> {
        let end = self.longest_run_end?;
        end.checked_sub_days(Days::new(u64::from(self.longest_run.saturating_sub(1))))
    }
}

/// Compute streaks over the distinct `dates`, relative to `today`.
///
/// The current run counts back from today, or from yesterday when nothing
/// was committed today, and stops at the first missing day. Dates after
/// `today` are ignored for the current run. The longest run is the first
/// maximal run found walking from the most recent date backwards.
pub fn compute(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakResult {
    let mut descending = dates.iter().rev().copied();
    let Some(first) = descending.next() else {
        return StreakResult::default();
    };

    let mut longest_run = 1;
    let mut longest_run_end = first;
    let mut run = 1;
    let mut run_end = first;
    let mut prev = first;
    for date in descending {
        if prev.pred_opt() == Some(date) {
            run += 1;
            if run > longest_run {
                longest_run = run;
                longest_run_end = run_end;
            }
        } else {
            run = 1;
            run_end = date;
        }
        prev = date;
    }

    StreakResult {
        longest_run,
        longest_run_end: Some(longest_run_end),
        current_run: current_run(dates, today),
    }
}

fn current_run(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut count = 0;
    let mut check = today;
    for &date in dates.range(..=today).rev() {
        let Some(day_before) = check.pred_opt() else {
            break;
        };
        if date == check || date == day_before {
            count += 1;
            check = date;
        } else {
            break;
        }
    }
    count
}
