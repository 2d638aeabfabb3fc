// Hostaway-to-Webflow listing sync.
//
// The orchestration is log-and-continue: one listing failing to map or
// upload must not abort the run. Field mapping itself is pure so the
// per-field rules are testable without network access.

use crate::hostaway::{HostawayClient, PolicySet};
use crate::models::{CancellationPolicy, HostawayListing, Review};
use crate::pricing::average_nightly_rate;
use crate::webflow::{WebflowClient, WebflowItem};
use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use tokio::time::{Duration, sleep};

const CREATE_PUBLISH_BATCH: usize = 20;
const UPDATE_PUBLISH_BATCH: usize = 100;
const ITEM_DELAY_MS: u64 = 150;
const BATCH_DELAY_MS: u64 = 300;
const ARCHIVE_DELAY_MS: u64 = 100;
const AVERAGE_WINDOW_DAYS: i64 = 90;

const PET_AMENITY_NAMES: &[&str] = &[
    "pets allowed",
    "pets welcome",
    "pet friendly",
    "dog friendly",
    "cat friendly",
    "allows pets",
];
const SMOKING_AMENITY_NAMES: &[&str] = &["smoking allowed", "smoking permitted"];
const CHILDREN_AMENITY_NAMES: &[&str] = &[
    "suitable for children",
    "children welcome",
    "family friendly",
    "suitable for kids",
];
const INFANT_AMENITY_NAMES: &[&str] = &[
    "suitable for infants",
    "infants welcome",
    "baby friendly",
];

/// Fallback cancellation texts keyed by normalized policy name.
const CANCELLATION_POLICY_TEXT: &[(&str, &str)] = &[
    ("flexible", "Free cancellation up to 24 hours before check-in. After that, cancel before check-in and get a full refund, minus the first night and service fee."),
    ("moderate", "Free cancellation up to 5 days before check-in. After that, cancel up to 24 hours before check-in and get a 50% refund, minus the service fee."),
    ("firm", "Full refund up to 30 days before check-in. 50% refund if cancelled 7-30 days before check-in. No refund within 7 days of check-in."),
    ("strict", "Full refund if cancelled within 48 hours of booking and at least 14 days before check-in. 50% refund if cancelled at least 7 days before check-in. No refund after that."),
    ("strict_14_with_grace_period", "Full refund if cancelled within 48 hours of booking and at least 14 days before check-in. 50% refund if cancelled at least 7 days before check-in. No refund after that."),
    ("super_strict_30", "50% refund up to 30 days before check-in. No refund after that."),
    ("super_strict_60", "50% refund up to 60 days before check-in. No refund after that."),
    ("long_term", "First month is non-refundable. For stays over 28 nights, 30 days notice required to cancel."),
    ("non_refundable", "Non-refundable. Guests pay the full amount if they cancel."),
    ("standard", "Standard cancellation policy applies. Please contact us for details."),
];

#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncOutcome {
    pub created: usize,
    pub updated: usize,
    pub archived: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct SyncStatus {
    pub hostaway: SourceCounts,
    pub webflow: TargetCounts,
    pub needs_sync: i64,
}

#[derive(Debug, Serialize)]
pub struct SourceCounts {
    pub total: usize,
    pub active: usize,
    pub archived: usize,
}

#[derive(Debug, Serialize)]
pub struct TargetCounts {
    pub total: usize,
}

/// Run the full sync: push every active listing into the CMS, publish in
/// batches, then archive items whose source listing disappeared.
pub async fn run_sync(hostaway: &HostawayClient, webflow: &WebflowClient) -> Result<SyncOutcome> {
    tracing::info!("Starting listing sync");
    let all_listings = hostaway.fetch_all_listings().await?;
    let listings: Vec<HostawayListing> = all_listings
        .into_iter()
        .filter(|l| !l.is_archived())
        .collect();
    tracing::info!("{} active listings after filtering", listings.len());

    let policies = hostaway.fetch_cancellation_policies().await?;
    tracing::info!("{} cancellation policies", policies.map.len());

    let webflow_items = webflow.list_items().await?;
    let mut item_by_listing: HashMap<String, String> = HashMap::new();
    for item in &webflow_items {
        if let Some(listing_id) = item.listing_id() {
            item_by_listing.insert(listing_id, item.id.clone());
        }
    }

    let (new_listings, existing_listings): (Vec<_>, Vec<_>) = listings
        .iter()
        .partition(|l| !item_by_listing.contains_key(&l.id.to_string()));
    tracing::info!(
        new = new_listings.len(),
        existing = existing_listings.len(),
        "Processing listings, new first"
    );

    let mut outcome = SyncOutcome::default();
    let mut updated_ids = Vec::new();
    let mut pending_publish = Vec::new();

    for listing in new_listings {
        match build_fields(hostaway, listing, &policies).await {
            Ok(fields) => match webflow.create_item(&fields).await {
                Ok(item_id) => {
                    outcome.created += 1;
                    pending_publish.push(item_id);
                    if pending_publish.len() >= CREATE_PUBLISH_BATCH {
                        if let Err(e) = webflow.publish_items(&pending_publish).await {
                            tracing::error!("Batch publish failed: {}", e);
                        }
                        pending_publish.clear();
                        sleep(Duration::from_millis(BATCH_DELAY_MS)).await;
                    }
                }
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(listing_id = listing.id, "Create failed: {}", e);
                }
            },
            Err(e) => {
                outcome.failed += 1;
                tracing::error!(listing_id = listing.id, "Mapping failed: {}", e);
            }
        }
        sleep(Duration::from_millis(ITEM_DELAY_MS)).await;
    }
    if !pending_publish.is_empty() {
        if let Err(e) = webflow.publish_items(&pending_publish).await {
            tracing::error!("Final create-batch publish failed: {}", e);
        }
    }

    for listing in existing_listings {
        let listing_key = listing.id.to_string();
        // Partitioned on this key above, so the lookup always hits.
        let Some(item_id) = item_by_listing.get(&listing_key) else {
            continue;
        };
        match build_fields(hostaway, listing, &policies).await {
            Ok(fields) => match webflow.update_item(item_id, &fields).await {
                Ok(()) => {
                    outcome.updated += 1;
                    updated_ids.push(item_id.clone());
                }
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(listing_id = listing.id, "Update failed: {}", e);
                }
            },
            Err(e) => {
                outcome.failed += 1;
                tracing::error!(listing_id = listing.id, "Mapping failed: {}", e);
            }
        }
        sleep(Duration::from_millis(ITEM_DELAY_MS)).await;
    }

    for batch in updated_ids.chunks(UPDATE_PUBLISH_BATCH) {
        if let Err(e) = webflow.publish_items(batch).await {
            tracing::error!("Update-batch publish failed: {}", e);
        }
        sleep(Duration::from_millis(BATCH_DELAY_MS)).await;
    }

    if outcome.created > 0 || outcome.updated > 0 {
        if let Err(e) = webflow.publish_site().await {
            tracing::error!("Site publish failed: {}", e);
        }
    }

    let live_ids: HashSet<String> = listings.iter().map(|l| l.id.to_string()).collect();
    for item in items_to_archive(&webflow_items, &live_ids) {
        // Checked by items_to_archive; kept for the log field.
        let listing_id = item.listing_id().unwrap_or_default();
        match webflow.archive_item(&item.id).await {
            Ok(()) => {
                outcome.archived += 1;
                tracing::info!(listing_id, "Archived stale item");
            }
            Err(e) => {
                outcome.failed += 1;
                tracing::error!(listing_id, "Archive failed: {}", e);
            }
        }
        sleep(Duration::from_millis(ARCHIVE_DELAY_MS)).await;
    }

    tracing::info!(
        created = outcome.created,
        updated = outcome.updated,
        archived = outcome.archived,
        failed = outcome.failed,
        "Sync complete"
    );
    Ok(outcome)
}

/// CMS items whose source listing no longer exists. Items carrying no
/// listing id are left alone; they were not created by the sync.
fn items_to_archive<'a>(
    items: &'a [WebflowItem],
    live_ids: &HashSet<String>,
) -> Vec<&'a WebflowItem> {
    items
        .iter()
        .filter(|item| {
            item.listing_id()
                .is_some_and(|listing_id| !live_ids.contains(&listing_id))
        })
        .collect()
}

/// Re-publish every CMS item, then the site.
pub async fn publish_all(webflow: &WebflowClient) -> Result<usize> {
    let items = webflow.list_items().await?;
    if items.is_empty() {
        tracing::info!("No items to publish");
        return Ok(0);
    }
    let ids: Vec<String> = items.into_iter().map(|i| i.id).collect();
    for batch in ids.chunks(UPDATE_PUBLISH_BATCH) {
        webflow.publish_items(batch).await?;
        sleep(Duration::from_millis(500)).await;
    }
    webflow.publish_site().await?;
    Ok(ids.len())
}

/// Count listings on both sides and how far apart they are.
pub async fn status(hostaway: &HostawayClient, webflow: &WebflowClient) -> Result<SyncStatus> {
    let all_listings = hostaway.fetch_all_listings().await?;
    let active = all_listings.iter().filter(|l| !l.is_archived()).count();
    let webflow_items = webflow.list_items().await?;
    Ok(SyncStatus {
        hostaway: SourceCounts {
            total: all_listings.len(),
            active,
            archived: all_listings.len() - active,
        },
        webflow: TargetCounts {
            total: webflow_items.len(),
        },
        needs_sync: active as i64 - webflow_items.len() as i64,
    })
}

/// Map the first active listing end to end, returning both the raw source
/// fields and the computed CMS fields for inspection.
pub async fn test_mapping(hostaway: &HostawayClient) -> Result<Value> {
    let listings = hostaway.fetch_all_listings().await?;
    let policies = hostaway.fetch_cancellation_policies().await?;
    let Some(listing) = listings.iter().find(|l| !l.is_archived()).or(listings.first()) else {
        return Ok(json!({ "error": "No listings found" }));
    };
    let fields = build_fields(hostaway, listing, &policies).await?;
    Ok(json!({
        "listingId": listing.id,
        "listingName": listing.name,
        "rawData": {
            "cancellationPolicy": listing.cancellation_policy,
            "cancellationPolicyId": listing.cancellation_policy_id,
            "maxPetsAllowed": listing.max_pets_allowed,
            "houseRules": listing.house_rules,
            "checkInTimeStart": listing.check_in_time_start,
            "checkOutTime": listing.check_out_time,
        },
        "computedValues": {
            "petsAllowed": fields.get("pets-allowed"),
            "smokingAllowed": fields.get("smoking-allowed"),
            "cancellationPolicyText": fields.get("cancellation-policy"),
        },
        "webflowFields": fields,
    }))
}

/// Gather the per-listing remote extras (reviews, 90-day average) and run the
/// pure mapping. Both extras soft-fail to defaults.
async fn build_fields(
    hostaway: &HostawayClient,
    listing: &HostawayListing,
    policies: &PolicySet,
) -> Result<Value> {
    let reviews = match hostaway.fetch_reviews(listing.id).await {
        Ok(reviews) => reviews,
        Err(e) => {
            tracing::warn!(listing_id = listing.id, "Could not fetch reviews: {}", e);
            Vec::new()
        }
    };
    let comments = review_comments(&reviews);

    let today = Utc::now().date_naive();
    let window_end = today + ChronoDuration::days(AVERAGE_WINDOW_DAYS);
    let average_price = match hostaway.fetch_calendar(listing.id, today, window_end).await {
        Ok(days) => average_nightly_rate(&days),
        Err(e) => {
            tracing::warn!(listing_id = listing.id, "Could not average prices: {}", e);
            None
        }
    };

    Ok(map_listing_fields(listing, &policies.map, average_price, &comments))
}

/// Pure mapping from a source listing to CMS field data.
pub fn map_listing_fields(
    listing: &HostawayListing,
    policies: &HashMap<i64, CancellationPolicy>,
    average_price: Option<i64>,
    review_comments: &str,
) -> Value {
    let listing_id = listing.id.to_string();
    let price = average_price
        .map(|p| p as f64)
        .or(listing.price)
        .unwrap_or(0.0);
    let image_urls: Vec<&str> = listing
        .listing_images
        .iter()
        .filter_map(|img| img.url.as_deref())
        .collect();
    let amenity_names: Vec<&str> = listing
        .listing_amenities
        .iter()
        .filter_map(|a| a.amenity_name.as_deref())
        .collect();

    let mut fields = Map::new();
    fields.insert("name".into(), json!(listing.display_name()));
    fields.insert("slug".into(), json!(listing_id));
    fields.insert("listing-id".into(), json!(listing_id));
    fields.insert("property-type".into(), json!(format_property_type(listing)));
    fields.insert(
        "description".into(),
        json!(listing.description.as_deref().unwrap_or("")),
    );
    fields.insert("house-rules-3".into(), json!(build_house_rules_html(listing)));
    fields.insert("guests".into(), json!(listing.person_capacity.unwrap_or(0)));
    fields.insert("bedrooms".into(), json!(listing.bedrooms_number.unwrap_or(0)));
    fields.insert("beds".into(), json!(listing.beds_number.unwrap_or(0)));
    fields.insert(
        "bathrooms".into(),
        json!(listing.bathrooms_number.unwrap_or(0.0)),
    );
    fields.insert("price".into(), json!(price));
    fields.insert("min-nights".into(), json!(listing.min_nights.unwrap_or(1)));
    fields.insert(
        "check-in-time".into(),
        json!(format_time(listing.check_in_time_start)),
    );
    fields.insert(
        "check-out-time".into(),
        json!(format_time(listing.check_out_time)),
    );
    fields.insert("pets-allowed".into(), json!(is_pets_allowed(listing)));
    fields.insert("smoking-allowed".into(), json!(is_smoking_allowed(listing)));
    fields.insert(
        "cancellation-policy".into(),
        json!(cancellation_policy_text(listing, policies)),
    );
    fields.insert("images-html".into(), json!(build_images_html(listing)));
    fields.insert("amenities-html".into(), json!(build_amenities_html(listing)));
    fields.insert("featured-image".into(), json!(featured_image(listing)));
    fields.insert("city".into(), json!(listing.city.as_deref().unwrap_or("")));
    fields.insert("state".into(), json!(listing.state.as_deref().unwrap_or("")));
    fields.insert(
        "latitude".into(),
        json!(listing.lat.map(|v| v.to_string()).unwrap_or_default()),
    );
    fields.insert(
        "longitude".into(),
        json!(listing.lng.map(|v| v.to_string()).unwrap_or_default()),
    );
    fields.insert("is-live".into(), json!(!listing.is_archived()));
    fields.insert("images-urls-2".into(), json!(image_urls.join(", ")));
    fields.insert("amenities-list".into(), json!(amenity_names.join(", ")));
    // Source ratings are on a 10-point scale; the site shows 5 stars.
    fields.insert(
        "average-rating".into(),
        json!(listing.average_review_rating.map(|r| r / 2.0).unwrap_or(0.0)),
    );
    fields.insert("review-comments".into(), json!(review_comments));
    fields.insert(
        "booking-engine-active".into(),
        json!(listing.is_booking_engine_active),
    );
    Value::Object(fields)
}

/// Hour-of-day integer to a 12-hour clock label.
pub fn format_time(hour: Option<i64>) -> String {
    match hour {
        None => String::new(),
        Some(0) => "12:00 AM".to_string(),
        Some(12) => "12:00 PM".to_string(),
        Some(h) if (1..12).contains(&h) => format!("{}:00 AM", h),
        Some(h) if (13..24).contains(&h) => format!("{}:00 PM", h - 12),
        Some(_) => String::new(),
    }
}

pub fn format_property_type(listing: &HostawayListing) -> String {
    let type_name = match listing.property_type_id {
        Some(1) => "Apartment",
        Some(2) => "House",
        Some(3) => "Bed & Breakfast",
        Some(4) => "Boutique Hotel",
        Some(5) | Some(7) => "Cabin",
        Some(6) => "Condo",
        Some(8) => "Villa",
        Some(9) => "Cottage",
        Some(10) => "Townhouse",
        Some(11) => "Bungalow",
        Some(12) => "Chalet",
        Some(13) => "Guest House",
        Some(14) => "Loft",
        Some(15) => "Resort",
        _ => "Home",
    };
    match listing.room_type.as_deref() {
        Some("private_room") => format!("Private Room in {}", type_name),
        Some("shared_room") => format!("Shared Room in {}", type_name),
        _ => type_name.to_string(),
    }
}

fn has_amenity(listing: &HostawayListing, targets: &[&str]) -> bool {
    listing.listing_amenities.iter().any(|amenity| {
        let name = amenity
            .amenity_name
            .as_deref()
            .unwrap_or("")
            .to_lowercase();
        targets.iter().any(|target| name.contains(target))
    })
}

pub fn is_pets_allowed(listing: &HostawayListing) -> bool {
    has_amenity(listing, PET_AMENITY_NAMES) || listing.max_pets_allowed.unwrap_or(0) > 0
}

pub fn is_smoking_allowed(listing: &HostawayListing) -> bool {
    has_amenity(listing, SMOKING_AMENITY_NAMES)
}

pub fn is_children_allowed(listing: &HostawayListing) -> bool {
    has_amenity(listing, CHILDREN_AMENITY_NAMES) || listing.max_children_allowed.unwrap_or(0) > 0
}

pub fn is_infants_allowed(listing: &HostawayListing) -> bool {
    has_amenity(listing, INFANT_AMENITY_NAMES) || listing.max_infants_allowed.unwrap_or(0) > 0
}

fn normalize_policy_key(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn policy_text_for_key(key: &str) -> Option<&'static str> {
    CANCELLATION_POLICY_TEXT
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, text)| *text)
}

/// Resolve the cancellation text: the API policy's own description or text
/// wins, then a canned text matched by normalized policy name, then the
/// listing's policy type string, then the standard fallback.
pub fn cancellation_policy_text(
    listing: &HostawayListing,
    policies: &HashMap<i64, CancellationPolicy>,
) -> String {
    if let Some(policy) = listing
        .cancellation_policy_id
        .and_then(|id| policies.get(&id))
    {
        if let Some(description) = policy.description.as_deref().filter(|s| !s.is_empty()) {
            return description.to_string();
        }
        if let Some(text) = policy.text.as_deref().filter(|s| !s.is_empty()) {
            return text.to_string();
        }
        if let Some(name) = policy.name.as_deref().filter(|s| !s.is_empty()) {
            if let Some(text) = policy_text_for_key(&normalize_policy_key(name)) {
                return text.to_string();
            }
            return name.to_string();
        }
    }
    let key = normalize_policy_key(listing.cancellation_policy.as_deref().unwrap_or("standard"));
    policy_text_for_key(&key)
        .or_else(|| policy_text_for_key("standard"))
        .unwrap_or_default()
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.replace(['\n', '\r'], " ").trim().to_string()
}

pub fn build_house_rules_html(listing: &HostawayListing) -> String {
    let mut rules: Vec<(&str, &str, String, bool)> = Vec::new();
    let check_in = format_time(listing.check_in_time_start);
    if !check_in.is_empty() {
        rules.push(("clock", "Check-in", check_in, true));
    }
    let check_out = format_time(listing.check_out_time);
    if !check_out.is_empty() {
        rules.push(("clock", "Check-out", check_out, true));
    }
    let allowed_value = |allowed: bool| {
        if allowed { "allowed" } else { "not allowed" }.to_string()
    };
    let children = is_children_allowed(listing);
    let infants = is_infants_allowed(listing);
    let pets = is_pets_allowed(listing);
    let smoking = is_smoking_allowed(listing);
    rules.push(("child", "Children", allowed_value(children), children));
    rules.push(("baby", "Infants", allowed_value(infants), infants));
    rules.push(("paw", "Pets", allowed_value(pets), pets));
    rules.push(("smoking", "Smoking", allowed_value(smoking), smoking));
    rules.push(("party", "Parties/events", "not allowed".to_string(), false));

    let mut html = String::from("<div class=\"house-rules-grid\">");
    for (icon, label, value, allowed) in rules {
        let status_class = if allowed { "rule-allowed" } else { "rule-not-allowed" };
        html.push_str(&format!(
            "<div class=\"house-rule-item {}\" data-icon=\"{}\">\
             <span class=\"rule-icon rule-icon-{}\"></span>\
             <span class=\"rule-text\"><strong>{}:</strong> {}</span></div>",
            status_class, icon, icon, label, value
        ));
    }
    html.push_str("</div>");

    let additional = collapse_whitespace(listing.house_rules.as_deref().unwrap_or(""));
    if !additional.is_empty() {
        html.push_str(&format!(
            "<div class=\"house-rules-additional\"><strong>Additional Rules:</strong> {}</div>",
            additional
        ));
    }
    html
}

pub fn build_amenities_html(listing: &HostawayListing) -> String {
    if listing.listing_amenities.is_empty() {
        return String::new();
    }
    let mut html = String::from("<div class=\"amenities-grid\">");
    for amenity in &listing.listing_amenities {
        let Some(name) = amenity.amenity_name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let slug = slugify(name);
        html.push_str(&format!(
            "<div class=\"amenity-item\" data-amenity=\"{}\">\
             <span class=\"amenity-icon amenity-icon-{}\"></span>\
             <span class=\"amenity-name\">{}</span></div>",
            slug, slug, name
        ));
    }
    html.push_str("</div>");
    html
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub fn build_images_html(listing: &HostawayListing) -> String {
    if listing.listing_images.is_empty() {
        return String::new();
    }
    let mut html = String::from("<div class=\"images-gallery\">");
    for image in &listing.listing_images {
        let Some(url) = image.url.as_deref().filter(|u| !u.is_empty()) else {
            continue;
        };
        let caption = collapse_whitespace(image.caption.as_deref().unwrap_or(""))
            .replace('"', "&quot;");
        html.push_str(&format!(
            "<div class=\"image-item\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\"></div>",
            url, caption
        ));
    }
    html.push_str("</div>");
    html
}

/// Lowest sort order wins; unordered images count as order zero.
pub fn featured_image(listing: &HostawayListing) -> String {
    listing
        .listing_images
        .iter()
        .min_by_key(|img| img.sort_order.unwrap_or(0))
        .and_then(|img| img.url.clone())
        .unwrap_or_default()
}

/// Published reviews rated 9+ (of 10) with non-empty text, joined for the
/// single-field CMS column.
pub fn review_comments(reviews: &[Review]) -> String {
    reviews
        .iter()
        .filter(|r| r.status.as_deref() == Some("published"))
        .filter(|r| r.rating.is_some_and(|rating| rating >= 9.0))
        .filter_map(|r| r.public_review.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amenity, ListingImage};

    fn listing() -> HostawayListing {
        HostawayListing {
            id: 12345,
            name: Some("Mountain View Cabin".to_string()),
            ..Default::default()
        }
    }

    fn amenity(name: &str) -> Amenity {
        Amenity {
            amenity_name: Some(name.to_string()),
        }
    }

    #[test]
    fn format_time_covers_the_clock() {
        assert_eq!(format_time(Some(0)), "12:00 AM");
        assert_eq!(format_time(Some(9)), "9:00 AM");
        assert_eq!(format_time(Some(12)), "12:00 PM");
        assert_eq!(format_time(Some(15)), "3:00 PM");
        assert_eq!(format_time(None), "");
    }

    #[test]
    fn property_type_combines_id_and_room_type() {
        let mut l = listing();
        l.property_type_id = Some(5);
        assert_eq!(format_property_type(&l), "Cabin");

        l.room_type = Some("private_room".to_string());
        assert_eq!(format_property_type(&l), "Private Room in Cabin");

        l.property_type_id = Some(99);
        l.room_type = Some("shared_room".to_string());
        assert_eq!(format_property_type(&l), "Shared Room in Home");

        l.property_type_id = None;
        l.room_type = None;
        assert_eq!(format_property_type(&l), "Home");
    }

    #[test]
    fn pets_detected_from_amenities_or_max_count() {
        let mut l = listing();
        assert!(!is_pets_allowed(&l));

        l.listing_amenities = vec![amenity("Pet Friendly Yard")];
        assert!(is_pets_allowed(&l));

        l.listing_amenities.clear();
        l.max_pets_allowed = Some(2);
        assert!(is_pets_allowed(&l));

        l.max_pets_allowed = Some(0);
        assert!(!is_pets_allowed(&l));
    }

    #[test]
    fn smoking_only_detected_from_amenities() {
        let mut l = listing();
        l.listing_amenities = vec![amenity("Smoking Allowed")];
        assert!(is_smoking_allowed(&l));
        l.listing_amenities = vec![amenity("No smoking")];
        assert!(!is_smoking_allowed(&l));
    }

    #[test]
    fn policy_text_prefers_api_description() {
        let mut l = listing();
        l.cancellation_policy_id = Some(7);
        let mut policies = HashMap::new();
        policies.insert(
            7,
            CancellationPolicy {
                id: 7,
                name: Some("Moderate".to_string()),
                description: Some("Our house policy.".to_string()),
                text: None,
            },
        );
        assert_eq!(cancellation_policy_text(&l, &policies), "Our house policy.");
    }

    #[test]
    fn policy_name_falls_back_to_canned_text() {
        let mut l = listing();
        l.cancellation_policy_id = Some(7);
        let mut policies = HashMap::new();
        policies.insert(
            7,
            CancellationPolicy {
                id: 7,
                name: Some("Super Strict 30".to_string()),
                description: None,
                text: None,
            },
        );
        let text = cancellation_policy_text(&l, &policies);
        assert!(text.starts_with("50% refund up to 30 days"));
    }

    #[test]
    fn unknown_policy_uses_standard_fallback() {
        let mut l = listing();
        l.cancellation_policy = Some("mystery".to_string());
        let text = cancellation_policy_text(&l, &HashMap::new());
        assert_eq!(
            text,
            "Standard cancellation policy applies. Please contact us for details."
        );
    }

    #[test]
    fn listing_policy_string_is_normalized() {
        let mut l = listing();
        l.cancellation_policy = Some("Non-Refundable".to_string());
        let text = cancellation_policy_text(&l, &HashMap::new());
        assert!(text.starts_with("Non-refundable."));
    }

    #[test]
    fn featured_image_uses_lowest_sort_order() {
        let mut l = listing();
        l.listing_images = vec![
            ListingImage {
                url: Some("b.jpg".to_string()),
                caption: None,
                sort_order: Some(2),
            },
            ListingImage {
                url: Some("a.jpg".to_string()),
                caption: None,
                sort_order: Some(1),
            },
        ];
        assert_eq!(featured_image(&l), "a.jpg");
        l.listing_images.clear();
        assert_eq!(featured_image(&l), "");
    }

    #[test]
    fn review_comments_filters_and_joins() {
        let review = |status: &str, rating: f64, text: &str| Review {
            status: Some(status.to_string()),
            rating: Some(rating),
            public_review: Some(text.to_string()),
        };
        let reviews = vec![
            review("published", 10.0, "Amazing stay!"),
            review("published", 8.0, "Decent."),
            review("pending", 10.0, "Not yet visible"),
            review("published", 9.0, "  Would return.  "),
            Review {
                status: Some("published".to_string()),
                rating: Some(9.5),
                public_review: Some("   ".to_string()),
            },
        ];
        assert_eq!(review_comments(&reviews), "Amazing stay! | Would return.");
        assert_eq!(review_comments(&[]), "");
    }

    #[test]
    fn amenities_html_slugifies_names() {
        let mut l = listing();
        l.listing_amenities = vec![amenity("Hot Tub / Spa"), Amenity { amenity_name: None }];
        let html = build_amenities_html(&l);
        assert!(html.contains("data-amenity=\"hot-tub-spa\""));
        assert!(html.contains("<span class=\"amenity-name\">Hot Tub / Spa</span>"));

        l.listing_amenities.clear();
        assert_eq!(build_amenities_html(&l), "");
    }

    #[test]
    fn house_rules_html_includes_times_and_flags() {
        let mut l = listing();
        l.check_in_time_start = Some(16);
        l.check_out_time = Some(10);
        l.max_pets_allowed = Some(1);
        l.house_rules = Some("Quiet hours\nafter 10pm".to_string());
        let html = build_house_rules_html(&l);
        assert!(html.contains("<strong>Check-in:</strong> 4:00 PM"));
        assert!(html.contains("<strong>Check-out:</strong> 10:00 AM"));
        assert!(html.contains("<strong>Pets:</strong> allowed"));
        assert!(html.contains("<strong>Parties/events:</strong> not allowed"));
        assert!(html.contains("Additional Rules:</strong> Quiet hours after 10pm"));
    }

    #[test]
    fn mapped_fields_cover_the_collection_schema() {
        let mut l = listing();
        l.person_capacity = Some(6);
        l.average_review_rating = Some(9.4);
        l.is_booking_engine_active = true;
        l.lat = Some(36.1);
        let fields = map_listing_fields(&l, &HashMap::new(), Some(210), "Great spot!");

        assert_eq!(fields["name"], "Mountain View Cabin");
        assert_eq!(fields["slug"], "12345");
        assert_eq!(fields["listing-id"], "12345");
        assert_eq!(fields["guests"], 6);
        assert_eq!(fields["price"], 210.0);
        assert_eq!(fields["average-rating"], 4.7);
        assert_eq!(fields["review-comments"], "Great spot!");
        assert_eq!(fields["booking-engine-active"], true);
        assert_eq!(fields["latitude"], "36.1");
        assert_eq!(fields["longitude"], "");
        assert_eq!(fields["is-live"], true);
    }

    #[test]
    fn average_price_falls_back_to_listing_price() {
        let mut l = listing();
        l.price = Some(175.0);
        let fields = map_listing_fields(&l, &HashMap::new(), None, "");
        assert_eq!(fields["price"], 175.0);

        let fields = map_listing_fields(&listing(), &HashMap::new(), None, "");
        assert_eq!(fields["price"], 0.0);
    }

    #[test]
    fn archive_set_is_items_missing_from_the_source() {
        let item = |id: &str, listing_id: Option<&str>| WebflowItem {
            id: id.to_string(),
            field_data: listing_id.map(|l| json!({ "listing-id": l })),
        };
        let items = vec![
            item("a", Some("100")),
            item("b", Some("200")),
            item("c", None),
            item("d", Some("300")),
        ];
        let live_ids: HashSet<String> = ["100".to_string(), "300".to_string()].into();

        let stale = items_to_archive(&items, &live_ids);
        let stale_ids: Vec<&str> = stale.iter().map(|i| i.id.as_str()).collect();
        // Only the item whose listing vanished; no-listing-id items are kept
        assert_eq!(stale_ids, vec!["b"]);

        assert!(items_to_archive(&[], &live_ids).is_empty());
    }

    #[test]
    fn archived_listing_maps_to_not_live() {
        let mut l = listing();
        l.special_status = Some("archived".to_string());
        let fields = map_listing_fields(&l, &HashMap::new(), None, "");
        assert_eq!(fields["is-live"], false);
    }
}
