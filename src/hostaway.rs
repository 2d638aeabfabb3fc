// Client for the Hostaway availability/pricing/listings API.
//
// Widget-facing calls (calendar, listing details, price details) surface
// BookingError so the session can convert failures into transient messages;
// sync-facing calls propagate anyhow errors to the run orchestrator.

use crate::error::BookingError;
use crate::models::{
    CalendarDay, CalendarDayWire, CancellationPolicy, HostawayListing, ListingDetails,
    PriceQuote, ResultEnvelope, Review,
};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, sleep};

const PAGE_LIMIT: usize = 100;
const PAGE_DELAY_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct HostawayClient {
    http: Arc<Client>,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Cancellation policies keyed by id, with the raw general/Airbnb lists
/// kept for the diagnostics endpoint.
#[derive(Debug, Default)]
pub struct PolicySet {
    pub general: Vec<CancellationPolicy>,
    pub airbnb: Vec<CancellationPolicy>,
    pub map: HashMap<i64, CancellationPolicy>,
}

impl HostawayClient {
    pub fn new(http: Arc<Client>, base_url: impl Into<String>) -> Self {
        HostawayClient {
            http,
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("Cache-Control", "no-cache");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Exchange account credentials for a bearer token (client credentials
    /// grant, form-encoded).
    pub async fn access_token(&self, account_id: &str, api_secret: &str) -> Result<String> {
        let response = self
            .token_request(account_id, api_secret)
            .send()
            .await?
            .error_for_status()?;
        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse access token response")?;
        token
            .access_token
            .ok_or_else(|| anyhow!("Access token missing from response"))
    }

    fn token_request(&self, account_id: &str, api_secret: &str) -> reqwest::RequestBuilder {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", account_id),
            ("client_secret", api_secret),
            ("scope", "general"),
        ];
        self.http
            .post(format!("{}/accessTokens", self.base_url))
            .form(&params)
    }

    /// Fetch every listing, paging with offset/limit and a polite delay
    /// between pages.
    pub async fn fetch_all_listings(&self) -> Result<Vec<HostawayListing>> {
        let mut all_listings = Vec::new();
        let mut offset = 0;
        loop {
            let path = format!(
                "/listings?includeResources=1&limit={}&offset={}",
                PAGE_LIMIT, offset
            );
            let response = self.get(&path).send().await?.error_for_status()?;
            let envelope: ResultEnvelope<Vec<HostawayListing>> = response
                .json()
                .await
                .context("Failed to parse listings page")?;

            if envelope.status.as_deref() == Some("fail") {
                return Err(anyhow!("Listings API returned failure status"));
            }
            let page = envelope.result.unwrap_or_default();
            tracing::debug!(offset, count = page.len(), "Fetched listings page");
            if page.is_empty() {
                break;
            }
            let page_len = page.len();
            all_listings.extend(page);
            if page_len < PAGE_LIMIT {
                break;
            }
            offset += PAGE_LIMIT;
            sleep(Duration::from_millis(PAGE_DELAY_MS)).await;
        }
        tracing::info!("Total listings fetched: {}", all_listings.len());
        Ok(all_listings)
    }

    /// Fetch general and Airbnb cancellation policies and merge them into
    /// one id-keyed map. Airbnb policies are optional; a failure there is
    /// logged and skipped.
    pub async fn fetch_cancellation_policies(&self) -> Result<PolicySet> {
        let response = self
            .get("/cancellationPolicies")
            .send()
            .await?
            .error_for_status()?;
        let envelope: ResultEnvelope<Vec<CancellationPolicy>> = response
            .json()
            .await
            .context("Failed to parse cancellation policies")?;
        let general = envelope.result.unwrap_or_default();

        let airbnb = match self.fetch_airbnb_policies().await {
            Ok(policies) => policies,
            Err(e) => {
                tracing::warn!("Could not fetch Airbnb policies: {}", e);
                Vec::new()
            }
        };

        let mut map = HashMap::new();
        for policy in general.iter().chain(airbnb.iter()) {
            map.insert(policy.id, policy.clone());
        }
        Ok(PolicySet { general, airbnb, map })
    }

    async fn fetch_airbnb_policies(&self) -> Result<Vec<CancellationPolicy>> {
        let response = self
            .get("/airbnbCancellationPolicies")
            .send()
            .await?
            .error_for_status()?;
        let envelope: ResultEnvelope<Vec<CancellationPolicy>> = response.json().await?;
        Ok(envelope.result.unwrap_or_default())
    }

    pub async fn fetch_reviews(&self, listing_id: i64) -> Result<Vec<Review>> {
        let response = self
            .get(&format!("/reviews?listingId={}", listing_id))
            .send()
            .await?
            .error_for_status()?;
        let envelope: ResultEnvelope<Vec<Review>> = response
            .json()
            .await
            .context("Failed to parse reviews response")?;
        Ok(envelope.result.unwrap_or_default())
    }

    /// Fetch one calendar window. The whole window is parsed before anything
    /// is returned, so callers can merge it all-or-nothing.
    pub async fn fetch_calendar(
        &self,
        listing_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CalendarDay>, BookingError> {
        let path = format!(
            "/listings/{}/calendar?startDate={}&endDate={}",
            listing_id, start, end
        );
        let response = self
            .get(&path)
            .send()
            .await
            .map_err(|e| BookingError::Network(format!("Failed to load calendar: {}", e)))?
            .error_for_status()
            .map_err(|e| BookingError::Network(format!("Failed to load calendar: {}", e)))?;
        let envelope: ResultEnvelope<Vec<CalendarDayWire>> = response
            .json()
            .await
            .map_err(|e| BookingError::Network(format!("Failed to parse calendar: {}", e)))?;
        Ok(envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .map(CalendarDay::from)
            .collect())
    }

    pub async fn fetch_listing_details(
        &self,
        listing_id: i64,
    ) -> Result<ListingDetails, BookingError> {
        let response = self
            .get(&format!("/listings/{}", listing_id))
            .send()
            .await
            .map_err(|e| BookingError::Network(format!("Failed to load listing: {}", e)))?
            .error_for_status()
            .map_err(|e| BookingError::Network(format!("Failed to load listing: {}", e)))?;
        let envelope: ResultEnvelope<ListingDetails> = response
            .json()
            .await
            .map_err(|e| BookingError::Network(format!("Failed to parse listing: {}", e)))?;
        Ok(envelope.result.unwrap_or_default())
    }

    /// Request a priced quote for a completed range.
    pub async fn price_details(
        &self,
        listing_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
    ) -> Result<PriceQuote, BookingError> {
        let body = json!({
            "startingDate": check_in.to_string(),
            "endingDate": check_out.to_string(),
            "numberOfGuests": guests,
            "version": 2,
        });
        let mut builder = self
            .http
            .post(format!(
                "{}/listings/{}/calendar/priceDetails",
                self.base_url, listing_id
            ))
            .json(&body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| BookingError::Pricing(format!("Failed to calculate price: {}", e)))?
            .error_for_status()
            .map_err(|e| BookingError::Pricing(format!("Failed to calculate price: {}", e)))?;
        let envelope: ResultEnvelope<PriceQuote> = response
            .json()
            .await
            .map_err(|e| BookingError::Pricing(format!("Failed to parse price: {}", e)))?;
        envelope
            .result
            .ok_or_else(|| BookingError::Pricing("Price response had no result".to_string()))
    }
}
