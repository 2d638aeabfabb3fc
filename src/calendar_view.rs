// Day classification for calendar rendering.
//
// `render_days` is a pure function from session state + availability data
// to per-day view models, so the classification rules are testable without
// any rendering surface.
//
// A date can be a valid checkout boundary (the night before it is the last
// booked night) while being invalid as a check-in. The `CheckoutOnly`
// status keeps those two roles apart; they must never be conflated.

use crate::availability::{AvailabilityIndex, month_bounds};
use crate::selection::SelectionState;
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    /// Before today; never selectable regardless of availability data.
    Past,
    /// Valid as a new check-in.
    Available,
    /// Valid only as a range terminus, or shown disabled with a tooltip.
    CheckoutOnly,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayViewModel {
    pub date: NaiveDate,
    pub day: u32,
    pub status: DayStatus,
    pub selectable: bool,
    pub selected: bool,
    pub in_range: bool,
    pub tooltip: Option<String>,
}

/// Classify every date of a displayed month.
pub fn render_days(
    selection: &SelectionState,
    index: &AvailabilityIndex,
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Vec<DayViewModel> {
    let Some((first, last)) = month_bounds(year, month) else {
        return Vec::new();
    };
    let min_nights = selection.min_nights();
    let mut days = Vec::with_capacity(last.day() as usize);

    let mut date = first;
    loop {
        let (status, selectable, tooltip) = classify(selection, index, date, today, min_nights);

        let selected =
            selection.check_in() == Some(date) || selection.check_out() == Some(date);
        let in_range = match (selection.check_in(), selection.check_out()) {
            (Some(check_in), Some(check_out)) => date > check_in && date < check_out,
            _ => false,
        };

        days.push(DayViewModel {
            date,
            day: date.day(),
            status,
            selectable,
            selected,
            in_range,
            tooltip,
        });

        if date == last {
            break;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    days
}

fn classify(
    selection: &SelectionState,
    index: &AvailabilityIndex,
    date: NaiveDate,
    today: NaiveDate,
    min_nights: i64,
) -> (DayStatus, bool, Option<String>) {
    if date < today {
        return (DayStatus::Past, false, None);
    }

    let min_nights_tooltip = || Some(format!("Minimum {} nights required", min_nights));
    let prev_available = date.pred_opt().is_some_and(|prev| index.is_available(prev));

    if selection.selecting_checkout() {
        if let Some(check_in) = selection.check_in() {
            let nights = date.signed_duration_since(check_in).num_days();
            if nights < min_nights {
                return (DayStatus::CheckoutOnly, false, min_nights_tooltip());
            }
            // The checkout day itself need not be available; the night
            // before it must be.
            return if prev_available {
                (DayStatus::CheckoutOnly, true, None)
            } else {
                (DayStatus::Unavailable, false, None)
            };
        }
    }

    if index.is_available(date) {
        // Not enough runway after this date to satisfy the minimum stay
        if index.run_length(date) < min_nights {
            (DayStatus::CheckoutOnly, false, min_nights_tooltip())
        } else {
            (DayStatus::Available, true, None)
        }
    } else if prev_available {
        (
            DayStatus::CheckoutOnly,
            false,
            Some("Check-in unavailable".to_string()),
        )
    } else {
        (DayStatus::Unavailable, false, None)
    }
}
