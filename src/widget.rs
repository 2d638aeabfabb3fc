// Booking widget session controller.
//
// One `BookingWidget` per visitor session. It owns the availability index,
// the selection machine, the listing config and the latest quote, and turns
// remote failures into transient on-screen messages instead of errors the
// caller has to handle. The only hard error is a missing listing id at
// construction.

use crate::availability::{AvailabilityIndex, month_bounds, next_month, previous_month};
use crate::calendar_view::{DayViewModel, render_days};
use crate::error::BookingError;
use crate::hostaway::HostawayClient;
use crate::models::{ListingConfig, PriceQuote};
use crate::pricing::{PriceLine, average_nightly_rate, build_price_lines};
use crate::selection::{SelectOutcome, SelectionState};
use chrono::{Datelike, Duration, NaiveDate, Utc};

/// How long a transient error stays on screen before auto-dismissal.
pub const ERROR_DISMISS_SECS: u64 = 5;

const AVERAGE_WINDOW_DAYS: i64 = 90;

/// Page-supplied startup parameters.
#[derive(Debug, Clone, Default)]
pub struct WidgetInit {
    pub listing_id: Option<i64>,
    pub booking_active: bool,
}

/// Which panel is open. Opening one closes the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    None,
    Calendar,
    Guests,
}

/// User interactions forwarded from the rendering surface.
#[derive(Debug, Clone)]
pub enum WidgetCommand {
    ToggleCalendar,
    ToggleGuests,
    ClosePanel,
    SelectDate(NaiveDate),
    ClearDates,
    NextMonth,
    PreviousMonth,
    SetGuests(u32),
    AdjustGuests(i32),
    Reserve,
    DismissError,
}

/// What the surface should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Redirect(String),
}

#[derive(Debug)]
pub struct BookingWidget {
    client: HostawayClient,
    checkout_base_url: String,
    config: ListingConfig,
    bookable: bool,
    index: AvailabilityIndex,
    selection: SelectionState,
    visible_year: i32,
    visible_month: u32,
    pane: Pane,
    quote: Option<PriceQuote>,
    quote_busy: bool,
    quote_seq: u64,
    average_rate: Option<i64>,
    transient_error: Option<String>,
}

impl BookingWidget {
    /// Build a session for a listing. An absent listing id is the one
    /// unrecoverable setup failure.
    pub fn new(
        init: &WidgetInit,
        client: HostawayClient,
        checkout_base_url: impl Into<String>,
    ) -> Result<Self, BookingError> {
        let listing_id = init.listing_id.ok_or_else(|| {
            BookingError::Configuration("No listing id supplied".to_string())
        })?;
        let config = ListingConfig::with_defaults(listing_id);
        let selection = SelectionState::new(&config);
        let today = Utc::now().date_naive();
        Ok(BookingWidget {
            client,
            checkout_base_url: checkout_base_url.into(),
            config,
            bookable: init.booking_active,
            index: AvailabilityIndex::new(),
            selection,
            visible_year: today.year(),
            visible_month: today.month(),
            pane: Pane::None,
            quote: None,
            quote_busy: false,
            quote_seq: 0,
            average_rate: None,
            transient_error: None,
        })
    }

    pub fn bookable(&self) -> bool {
        self.bookable
    }

    pub fn pane(&self) -> Pane {
        self.pane
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    pub fn visible_month(&self) -> (i32, u32) {
        (self.visible_year, self.visible_month)
    }

    pub fn quote(&self) -> Option<&PriceQuote> {
        self.quote.as_ref()
    }

    pub fn quote_busy(&self) -> bool {
        self.quote_busy
    }

    /// Average nightly rate over the next 90 days, shown before any dates
    /// are picked.
    pub fn average_rate(&self) -> Option<i64> {
        self.average_rate
    }

    pub fn transient_error(&self) -> Option<&str> {
        self.transient_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.transient_error = None;
    }

    /// Initial loads: listing metadata, the visible and next month of
    /// availability, and the headline average rate. Everything degrades
    /// gracefully; an inactive widget loads nothing.
    pub async fn start(&mut self) {
        if !self.bookable {
            tracing::info!(
                listing_id = self.config.listing_id,
                "Booking engine inactive, widget disabled"
            );
            return;
        }

        match self.client.fetch_listing_details(self.config.listing_id).await {
            Ok(details) => {
                self.config.apply(&details);
                self.selection.adopt_config(&self.config);
            }
            Err(e) => {
                tracing::warn!("Listing metadata unavailable, using defaults: {}", e);
            }
        }

        self.load_visible_months().await;
        self.load_average_rate().await;
    }

    /// Fetch the visible month and the one after it, merging each window
    /// only when it arrives complete.
    async fn load_visible_months(&mut self) {
        let (next_year, next_month_num) = next_month(self.visible_year, self.visible_month);
        let mut failed = false;
        for (year, month) in [(self.visible_year, self.visible_month), (next_year, next_month_num)]
        {
            let Some((first, last)) = month_bounds(year, month) else {
                continue;
            };
            match self
                .client
                .fetch_calendar(self.config.listing_id, first, last)
                .await
            {
                Ok(days) => self.index.merge(days),
                Err(e) => {
                    tracing::warn!(year, month, "Calendar fetch failed: {}", e);
                    failed = true;
                }
            }
        }
        if failed {
            self.transient_error = Some("Failed to load calendar".to_string());
        }
    }

    async fn load_average_rate(&mut self) {
        let today = Utc::now().date_naive();
        let window_end = today + Duration::days(AVERAGE_WINDOW_DAYS);
        match self
            .client
            .fetch_calendar(self.config.listing_id, today, window_end)
            .await
        {
            Ok(days) => self.average_rate = average_nightly_rate(&days),
            Err(e) => tracing::warn!("Average rate unavailable: {}", e),
        }
    }

    /// Handle one user interaction. Failures never surface as errors; they
    /// become transient messages the surface shows and auto-dismisses after
    /// [`ERROR_DISMISS_SECS`].
    pub async fn dispatch(&mut self, command: WidgetCommand) -> DispatchOutcome {
        if !self.bookable {
            return DispatchOutcome::Handled;
        }
        match command {
            WidgetCommand::ToggleCalendar => self.toggle_pane(Pane::Calendar),
            WidgetCommand::ToggleGuests => self.toggle_pane(Pane::Guests),
            WidgetCommand::ClosePanel => self.pane = Pane::None,
            WidgetCommand::SelectDate(date) => self.select_date(date).await,
            WidgetCommand::ClearDates => {
                self.selection.clear();
                self.quote = None;
            }
            WidgetCommand::NextMonth => {
                let (year, month) = next_month(self.visible_year, self.visible_month);
                self.change_month(year, month).await;
            }
            WidgetCommand::PreviousMonth => {
                let (year, month) = previous_month(self.visible_year, self.visible_month);
                self.change_month(year, month).await;
            }
            WidgetCommand::SetGuests(count) => {
                if self.selection.set_guest_count(count) {
                    self.compute_price().await;
                }
            }
            WidgetCommand::AdjustGuests(delta) => {
                if self.selection.adjust_guests(delta) {
                    self.compute_price().await;
                }
            }
            WidgetCommand::Reserve => return self.reserve(),
            WidgetCommand::DismissError => self.transient_error = None,
        }
        DispatchOutcome::Handled
    }

    /// A second toggle of the open pane closes it; otherwise the requested
    /// pane opens and the other closes.
    fn toggle_pane(&mut self, pane: Pane) {
        self.pane = if self.pane == pane { Pane::None } else { pane };
    }

    async fn select_date(&mut self, date: NaiveDate) {
        match self.selection.select_date(date, &self.index) {
            Ok(SelectOutcome::CheckInSet(_)) => {
                self.quote = None;
            }
            Ok(SelectOutcome::RangeComplete { .. }) => {
                self.pane = Pane::None;
                self.compute_price().await;
            }
            Err(e) => {
                self.transient_error = Some(e.to_string());
            }
        }
    }

    async fn change_month(&mut self, year: i32, month: u32) {
        self.visible_year = year;
        self.visible_month = month;
        self.load_visible_months().await;
    }

    /// Request a quote for the completed range. Responses from superseded
    /// requests are discarded so a slow reply can never overwrite a newer
    /// one.
    async fn compute_price(&mut self) {
        let (Some(check_in), Some(check_out)) =
            (self.selection.check_in(), self.selection.check_out())
        else {
            return;
        };
        let seq = self.begin_quote();
        self.quote_busy = true;
        let result = self
            .client
            .price_details(
                self.config.listing_id,
                check_in,
                check_out,
                self.selection.guest_count(),
            )
            .await;
        self.finish_quote(seq, result);
    }

    fn begin_quote(&mut self) -> u64 {
        self.quote_seq += 1;
        self.quote_seq
    }

    /// Commit a quote response only if it belongs to the latest request.
    /// On failure the selected dates are kept; only the breakdown clears.
    fn finish_quote(&mut self, seq: u64, result: Result<PriceQuote, BookingError>) {
        if seq != self.quote_seq {
            tracing::debug!(seq, latest = self.quote_seq, "Discarding stale quote");
            return;
        }
        self.quote_busy = false;
        match result {
            Ok(quote) => self.quote = Some(quote),
            Err(e) => {
                tracing::warn!("Quote failed: {}", e);
                self.quote = None;
                self.transient_error = Some("Failed to calculate price".to_string());
            }
        }
    }

    /// Hand off to the hosted checkout. Requires a completed range; ignored
    /// while a quote is still in flight (the button is shown busy).
    fn reserve(&mut self) -> DispatchOutcome {
        if self.quote_busy {
            return DispatchOutcome::Handled;
        }
        let (Some(check_in), Some(check_out)) =
            (self.selection.check_in(), self.selection.check_out())
        else {
            self.transient_error = Some("Please select check-in and check-out dates".to_string());
            return DispatchOutcome::Handled;
        };
        let url = format!(
            "{}/checkout/{}?start={}&end={}&numberOfGuests={}",
            self.checkout_base_url,
            self.config.listing_id,
            check_in,
            check_out,
            self.selection.guest_count()
        );
        DispatchOutcome::Redirect(url)
    }

    /// Classified day cells for the visible month.
    pub fn render_days(&self) -> Vec<DayViewModel> {
        let today = Utc::now().date_naive();
        render_days(
            &self.selection,
            &self.index,
            self.visible_year,
            self.visible_month,
            today,
        )
    }

    /// The rendered price breakdown for the current quote, if any.
    pub fn price_lines(&self) -> Vec<PriceLine> {
        let (Some(quote), Some(nights)) = (self.quote.as_ref(), self.selection.nights()) else {
            return Vec::new();
        };
        build_price_lines(quote, nights, self.config.refundable_damage_deposit)
    }
}
