// Check-in/check-out selection state machine.
//
// One instance per booking session. Fields are private so the invariants
// hold by construction: a checkout date is never set without a valid
// check-in, and checkout-selection mode is active exactly when a check-in
// exists without a checkout. Failed validations leave the state untouched.

use crate::availability::AvailabilityIndex;
use crate::error::BookingError;
use crate::models::ListingConfig;
use chrono::NaiveDate;

/// What a successful `select_date` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Check-in committed; the machine now expects a checkout date.
    CheckInSet(NaiveDate),
    /// Checkout committed; the range is complete and should be priced.
    RangeComplete {
        check_in: NaiveDate,
        check_out: NaiveDate,
        nights: i64,
    },
}

#[derive(Debug, Clone)]
pub struct SelectionState {
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    selecting_checkout: bool,
    guest_count: u32,
    min_nights: i64,
    max_guests: u32,
}

impl SelectionState {
    pub fn new(config: &ListingConfig) -> Self {
        SelectionState {
            check_in: None,
            check_out: None,
            selecting_checkout: false,
            guest_count: 1,
            min_nights: config.min_nights.max(1),
            max_guests: config.max_guests.max(1),
        }
    }

    pub fn check_in(&self) -> Option<NaiveDate> {
        self.check_in
    }

    pub fn check_out(&self) -> Option<NaiveDate> {
        self.check_out
    }

    pub fn selecting_checkout(&self) -> bool {
        self.selecting_checkout
    }

    pub fn guest_count(&self) -> u32 {
        self.guest_count
    }

    pub fn min_nights(&self) -> i64 {
        self.min_nights
    }

    pub fn max_guests(&self) -> u32 {
        self.max_guests
    }

    pub fn range_complete(&self) -> bool {
        self.check_in.is_some() && self.check_out.is_some()
    }

    pub fn nights(&self) -> Option<i64> {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => {
                Some(check_out.signed_duration_since(check_in).num_days())
            }
            _ => None,
        }
    }

    /// Commit a candidate date. In check-in mode the date itself must be
    /// available; in checkout mode the whole span `[check_in, date)` is
    /// validated against the index and the minimum stay.
    pub fn select_date(
        &mut self,
        date: NaiveDate,
        index: &AvailabilityIndex,
    ) -> Result<SelectOutcome, BookingError> {
        if !self.selecting_checkout {
            if !index.is_available(date) {
                return Err(BookingError::Validation(
                    "This date is not available for check-in".to_string(),
                ));
            }
            self.check_in = Some(date);
            self.check_out = None;
            self.selecting_checkout = true;
            return Ok(SelectOutcome::CheckInSet(date));
        }

        // selecting_checkout is only ever true with a check-in set
        let check_in = self.check_in.ok_or_else(|| {
            BookingError::Validation("No check-in date selected".to_string())
        })?;

        if date <= check_in {
            return Err(BookingError::Validation(
                "Check-out must be after check-in".to_string(),
            ));
        }
        let nights = date.signed_duration_since(check_in).num_days();
        if nights < self.min_nights {
            return Err(BookingError::Validation(format!(
                "Minimum stay is {} nights",
                self.min_nights
            )));
        }
        if !index.span_available(check_in, date) {
            return Err(BookingError::Validation(
                "Some nights in this range are not available".to_string(),
            ));
        }

        self.check_out = Some(date);
        self.selecting_checkout = false;
        Ok(SelectOutcome::RangeComplete {
            check_in,
            check_out: date,
            nights,
        })
    }

    /// Reset the dates and the mode. Guest count and the availability index
    /// are left untouched.
    pub fn clear(&mut self) {
        self.check_in = None;
        self.check_out = None;
        self.selecting_checkout = false;
    }

    /// Clamp and set the guest count. Returns true when a completed range
    /// needs repricing (guest count affects the quote).
    pub fn set_guest_count(&mut self, count: u32) -> bool {
        let clamped = count.clamp(1, self.max_guests);
        let changed = clamped != self.guest_count;
        self.guest_count = clamped;
        changed && self.range_complete()
    }

    /// Step the guest count by a delta (the +/- controls).
    pub fn adjust_guests(&mut self, delta: i32) -> bool {
        let next = self.guest_count as i64 + delta as i64;
        self.set_guest_count(next.clamp(1, self.max_guests as i64) as u32)
    }

    /// Adopt freshly loaded listing parameters without discarding an
    /// in-progress selection. The guest count is re-clamped to the new
    /// capacity.
    pub fn adopt_config(&mut self, config: &ListingConfig) {
        self.min_nights = config.min_nights.max(1);
        self.max_guests = config.max_guests.max(1);
        self.guest_count = self.guest_count.clamp(1, self.max_guests);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CalendarDay;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn index_with(available: &[u32], unavailable: &[u32]) -> AvailabilityIndex {
        let mut index = AvailabilityIndex::new();
        index.merge(available.iter().map(|&d| CalendarDay {
            date: date(d),
            is_available: true,
            price: Some(150.0),
        }));
        index.merge(unavailable.iter().map(|&d| CalendarDay {
            date: date(d),
            is_available: false,
            price: None,
        }));
        index
    }

    fn state() -> SelectionState {
        SelectionState::new(&ListingConfig::with_defaults(1))
    }

    #[test]
    fn check_in_requires_available_date() {
        let index = index_with(&[1, 2, 3], &[4]);
        let mut selection = state();

        let err = selection.select_date(date(4), &index).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert_eq!(selection.check_in(), None);
        assert!(!selection.selecting_checkout());

        let outcome = selection.select_date(date(1), &index).unwrap();
        assert_eq!(outcome, SelectOutcome::CheckInSet(date(1)));
        assert!(selection.selecting_checkout());
        assert_eq!(selection.check_out(), None);
    }

    #[test]
    fn checkout_must_be_strictly_after_check_in() {
        let index = index_with(&[1, 2, 3, 4, 5], &[]);
        let mut selection = state();
        selection.select_date(date(3), &index).unwrap();

        assert!(selection.select_date(date(3), &index).is_err());
        assert!(selection.select_date(date(2), &index).is_err());
        // Failed validation leaves the machine in checkout mode
        assert!(selection.selecting_checkout());
        assert_eq!(selection.check_in(), Some(date(3)));
    }

    #[test]
    fn minimum_stay_is_enforced() {
        // Worked example: March 1-5 available, March 6 unavailable, min 2
        let index = index_with(&[1, 2, 3, 4, 5], &[6]);
        let mut selection = state();
        selection.select_date(date(1), &index).unwrap();

        let err = selection.select_date(date(2), &index).unwrap_err();
        assert!(err.to_string().contains("Minimum stay is 2 nights"));
        assert_eq!(selection.check_out(), None);

        let outcome = selection.select_date(date(3), &index).unwrap();
        assert_eq!(
            outcome,
            SelectOutcome::RangeComplete {
                check_in: date(1),
                check_out: date(3),
                nights: 2,
            }
        );
        assert!(!selection.selecting_checkout());
    }

    #[test]
    fn gap_anywhere_in_span_rejects_the_whole_range() {
        let index = index_with(&[1, 2, 4, 5], &[3]);
        let mut selection = state();
        selection.select_date(date(1), &index).unwrap();

        let err = selection.select_date(date(5), &index).unwrap_err();
        assert!(err.to_string().contains("not available"));
        assert_eq!(selection.check_out(), None);
        assert!(selection.selecting_checkout());
    }

    #[test]
    fn checkout_day_itself_need_not_be_available() {
        let index = index_with(&[1, 2, 3, 4, 5], &[6]);
        let mut selection = state();
        selection.select_date(date(1), &index).unwrap();

        // March 6 is unavailable but valid as a checkout boundary
        let outcome = selection.select_date(date(6), &index).unwrap();
        assert!(matches!(outcome, SelectOutcome::RangeComplete { nights: 5, .. }));
    }

    #[test]
    fn committed_range_satisfies_invariants() {
        let index = index_with(&[10, 11, 12, 13], &[]);
        let mut selection = state();
        selection.select_date(date(10), &index).unwrap();
        selection.select_date(date(13), &index).unwrap();

        let nights = selection.nights().unwrap();
        assert!(nights >= selection.min_nights());
        assert!(index.span_available(
            selection.check_in().unwrap(),
            selection.check_out().unwrap()
        ));
    }

    #[test]
    fn clear_then_select_matches_fresh_session() {
        let index = index_with(&[1, 2, 3, 4], &[]);

        let mut reused = state();
        reused.select_date(date(1), &index).unwrap();
        reused.select_date(date(3), &index).unwrap();
        reused.clear();
        reused.select_date(date(2), &index).unwrap();

        let mut fresh = state();
        fresh.select_date(date(2), &index).unwrap();

        assert_eq!(reused.check_in(), fresh.check_in());
        assert_eq!(reused.check_out(), fresh.check_out());
        assert_eq!(reused.selecting_checkout(), fresh.selecting_checkout());
    }

    #[test]
    fn clear_keeps_guest_count() {
        let mut selection = state();
        selection.set_guest_count(4);
        selection.clear();
        assert_eq!(selection.guest_count(), 4);
    }

    #[test]
    fn guest_count_is_clamped_and_triggers_reprice_only_with_range() {
        let index = index_with(&[1, 2, 3, 4], &[]);
        let mut selection = state();

        assert!(!selection.set_guest_count(3));
        assert!(!selection.set_guest_count(99));
        assert_eq!(selection.guest_count(), selection.max_guests());

        selection.set_guest_count(2);
        selection.select_date(date(1), &index).unwrap();
        selection.select_date(date(3), &index).unwrap();
        assert!(selection.set_guest_count(5));
        assert!(!selection.set_guest_count(5)); // unchanged, no reprice
    }

    #[test]
    fn adjust_guests_steps_within_bounds() {
        let mut selection = state();
        selection.adjust_guests(-1);
        assert_eq!(selection.guest_count(), 1);
        selection.adjust_guests(1);
        assert_eq!(selection.guest_count(), 2);
    }

    #[test]
    fn adopt_config_preserves_selection_and_reclamps_guests() {
        let index = index_with(&[1, 2, 3, 4], &[]);
        let mut selection = state();
        selection.set_guest_count(8);
        selection.select_date(date(1), &index).unwrap();
        selection.select_date(date(3), &index).unwrap();

        let mut config = ListingConfig::with_defaults(1);
        config.max_guests = 4;
        config.min_nights = 3;
        selection.adopt_config(&config);

        assert_eq!(selection.check_in(), Some(date(1)));
        assert_eq!(selection.check_out(), Some(date(3)));
        assert_eq!(selection.guest_count(), 4);
        assert_eq!(selection.min_nights(), 3);
    }
}
