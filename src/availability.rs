// In-memory availability index for one listing.
//
// Populated one calendar-month window at a time; entries are overwritten by
// newer fetches of the same dates, never partially merged. The index grows
// for the life of a session (a session displays at most a handful of
// months, so there is no eviction).

use crate::models::CalendarDay;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;

/// How far ahead of a candidate check-in date the contiguous-availability
/// scan looks before giving up.
pub const LOOKAHEAD_DAYS: i64 = 30;

#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    days: HashMap<NaiveDate, CalendarDay>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of fetched days, overwriting existing entries for the
    /// same dates. Callers only invoke this with a fully fetched window, so
    /// a failed fetch never leaves a partial merge behind.
    pub fn merge(&mut self, days: impl IntoIterator<Item = CalendarDay>) {
        for day in days {
            self.days.insert(day.date, day);
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days.get(&date)
    }

    /// A date with no data counts as unavailable.
    pub fn is_available(&self, date: NaiveDate) -> bool {
        self.days.get(&date).is_some_and(|d| d.is_available)
    }

    /// Length of the contiguous run of available dates starting at `start`,
    /// capped at [`LOOKAHEAD_DAYS`]. Stops at the first unavailable date or
    /// gap in data.
    pub fn run_length(&self, start: NaiveDate) -> i64 {
        let mut run = 0;
        for offset in 0..LOOKAHEAD_DAYS {
            let Some(date) = start.checked_add_days(Days::new(offset as u64)) else {
                break;
            };
            if self.is_available(date) {
                run += 1;
            } else {
                break;
            }
        }
        run
    }

    /// Whether every date in `[check_in, check_out)` is available. The
    /// checkout date itself is excluded: only the night before it matters.
    pub fn span_available(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        let mut date = check_in;
        while date < check_out {
            if !self.is_available(date) {
                return false;
            }
            let Some(next) = date.succ_opt() else {
                return false;
            };
            date = next;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = next_month(year, month);
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    Some((first, last))
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 { (year - 1, 12) } else { (year, month - 1) }
}
