// Domain types and wire structs shared across the widget engine and the
// sync job. Wire structs mirror the remote JSON (camelCase keys, 0/1
// booleans, occasionally string-coded numbers).

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_GUESTS: u32 = 12;
pub const DEFAULT_MIN_NIGHTS: i64 = 2;

/// One calendar date's bookability, as stored in the availability index.
/// Immutable once stored; a newer fetch of the same date replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_available: bool,
    pub price: Option<f64>,
}

/// Wire form of a calendar day. Older feeds send `isAvailable: 0|1`, newer
/// ones a `status` string; prices may arrive as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDayWire {
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "de_int_bool")]
    pub is_available: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub price: Option<f64>,
}

impl From<CalendarDayWire> for CalendarDay {
    fn from(wire: CalendarDayWire) -> Self {
        let is_available = wire.is_available || wire.status.as_deref() == Some("available");
        CalendarDay {
            date: wire.date,
            is_available,
            price: wire.price,
        }
    }
}

/// Per-listing parameters for the widget session. Populated with defaults at
/// construction and overwritten once the metadata fetch resolves; a failed
/// fetch leaves the defaults in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingConfig {
    pub listing_id: i64,
    pub max_guests: u32,
    pub min_nights: i64,
    pub refundable_damage_deposit: f64,
}

impl ListingConfig {
    pub fn with_defaults(listing_id: i64) -> Self {
        ListingConfig {
            listing_id,
            max_guests: DEFAULT_MAX_GUESTS,
            min_nights: DEFAULT_MIN_NIGHTS,
            refundable_damage_deposit: 0.0,
        }
    }

    /// Adopt fetched listing details, keeping defaults for absent fields.
    pub fn apply(&mut self, details: &ListingDetails) {
        if let Some(min_nights) = details.min_nights {
            if min_nights >= 1 {
                self.min_nights = min_nights;
            }
        }
        if let Some(deposit) = details.refundable_damage_deposit {
            self.refundable_damage_deposit = deposit;
        }
        if let Some(capacity) = details.person_capacity {
            if capacity >= 1 {
                self.max_guests = capacity;
            }
        }
    }
}

/// Listing metadata returned by `GET /listings/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDetails {
    #[serde(default)]
    pub min_nights: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub refundable_damage_deposit: Option<f64>,
    #[serde(default)]
    pub person_capacity: Option<u32>,
}

/// A priced quote for a completed date range. Superseded wholesale by the
/// next request, never merged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub total_price: f64,
    #[serde(default)]
    pub components: Vec<PriceComponent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceComponent {
    pub name: String,
    pub title: String,
    pub total: f64,
    #[serde(default, deserialize_with = "de_int_bool")]
    pub is_deleted: bool,
    #[serde(default, deserialize_with = "de_int_bool")]
    pub is_included_in_total_price: bool,
}

/// Generic `{ status, result }` envelope used by the Hostaway API.
#[derive(Debug, Deserialize)]
pub struct ResultEnvelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    pub result: Option<T>,
}

/// A source listing record with everything the sync mapping needs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostawayListing {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_listing_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub person_capacity: Option<u32>,
    #[serde(default)]
    pub bedrooms_number: Option<u32>,
    #[serde(default)]
    pub beds_number: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub bathrooms_number: Option<f64>,
    #[serde(default)]
    pub min_nights: Option<i64>,
    #[serde(default)]
    pub property_type_id: Option<i64>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub check_in_time_start: Option<i64>,
    #[serde(default)]
    pub check_out_time: Option<i64>,
    #[serde(default)]
    pub house_rules: Option<String>,
    #[serde(default)]
    pub cancellation_policy: Option<String>,
    #[serde(default)]
    pub cancellation_policy_id: Option<i64>,
    #[serde(default)]
    pub special_status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub average_review_rating: Option<f64>,
    #[serde(default, deserialize_with = "de_int_bool")]
    pub is_booking_engine_active: bool,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub price: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub lng: Option<f64>,
    #[serde(default)]
    pub max_pets_allowed: Option<i64>,
    #[serde(default)]
    pub max_children_allowed: Option<i64>,
    #[serde(default)]
    pub max_infants_allowed: Option<i64>,
    #[serde(default)]
    pub listing_amenities: Vec<Amenity>,
    #[serde(default)]
    pub listing_images: Vec<ListingImage>,
}

impl HostawayListing {
    pub fn is_archived(&self) -> bool {
        self.special_status.as_deref() == Some("archived")
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.external_listing_name.as_deref())
            .unwrap_or("Untitled")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amenity {
    #[serde(default)]
    pub amenity_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingImage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

/// A guest review as returned by the reviews endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub public_review: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPolicy {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

// --- Lenient deserializers for the wire quirks above ---

fn de_int_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    })
}

fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_day_wire_accepts_int_flag_and_string_price() {
        let day: CalendarDayWire = serde_json::from_str(
            r#"{"date": "2026-03-01", "isAvailable": 1, "price": "185.50"}"#,
        )
        .unwrap();
        let day: CalendarDay = day.into();
        assert!(day.is_available);
        assert_eq!(day.price, Some(185.5));
    }

    #[test]
    fn calendar_day_wire_accepts_status_string() {
        let day: CalendarDayWire =
            serde_json::from_str(r#"{"date": "2026-03-01", "status": "available", "price": 90}"#)
                .unwrap();
        let day: CalendarDay = day.into();
        assert!(day.is_available);
        assert_eq!(day.price, Some(90.0));
    }

    #[test]
    fn listing_config_apply_keeps_defaults_for_absent_fields() {
        let mut config = ListingConfig::with_defaults(42);
        config.apply(&ListingDetails {
            min_nights: Some(3),
            refundable_damage_deposit: None,
            person_capacity: None,
        });
        assert_eq!(config.min_nights, 3);
        assert_eq!(config.max_guests, DEFAULT_MAX_GUESTS);
        assert_eq!(config.refundable_damage_deposit, 0.0);
    }

    #[test]
    fn price_component_parses_int_booleans() {
        let component: PriceComponent = serde_json::from_str(
            r#"{"name": "baseRate", "title": "Base rate", "total": 300.0,
                "isDeleted": 0, "isIncludedInTotalPrice": 1}"#,
        )
        .unwrap();
        assert!(!component.is_deleted);
        assert!(component.is_included_in_total_price);
    }
}
