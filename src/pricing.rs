// Price breakdown building and money formatting.
//
// The remote quote only carries the total and its components; the
// per-night figure and the rendered line items are derived here.

use crate::models::{CalendarDay, PriceQuote};

/// One rendered line of the price breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLine {
    pub label: String,
    /// Rounded absolute amount; discounts carry the flag instead of a sign.
    pub amount: i64,
    pub is_discount: bool,
}

/// Derived nightly figure, not returned by the remote side.
pub fn price_per_night(total_price: f64, nights: i64) -> i64 {
    if nights <= 0 {
        return 0;
    }
    (total_price / nights as f64).round() as i64
}

/// Format a rounded amount with thousands separators ("1,234").
pub fn format_price(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let negative = rounded < 0;
    let digits = rounded.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Build the rendered breakdown for a quote. Deleted components and ones
/// excluded from the total are dropped; the base rate is relabeled as a
/// per-night multiplication; a refundable damage deposit line (sourced from
/// listing config, not the quote) is appended when positive.
pub fn build_price_lines(
    quote: &PriceQuote,
    nights: i64,
    refundable_damage_deposit: f64,
) -> Vec<PriceLine> {
    let mut lines = Vec::new();

    for component in &quote.components {
        if component.is_deleted || !component.is_included_in_total_price {
            continue;
        }
        let label = if component.name == "baseRate" {
            let per_night = price_per_night(component.total, nights);
            format!("${} x {} nights", format_price(per_night as f64), nights)
        } else {
            component.title.clone()
        };
        lines.push(PriceLine {
            label,
            amount: component.total.round().abs() as i64,
            is_discount: component.total < 0.0,
        });
    }

    if refundable_damage_deposit > 0.0 {
        lines.push(PriceLine {
            label: "Refundable Damage Deposit".to_string(),
            amount: refundable_damage_deposit.round() as i64,
            is_discount: false,
        });
    }

    lines
}

/// Average nightly rate over a calendar window, counting only available
/// days with a positive price. None when nothing qualifies.
pub fn average_nightly_rate(days: &[CalendarDay]) -> Option<i64> {
    let priced: Vec<f64> = days
        .iter()
        .filter(|day| day.is_available)
        .filter_map(|day| day.price)
        .filter(|price| *price > 0.0)
        .collect();
    if priced.is_empty() {
        return None;
    }
    let total: f64 = priced.iter().sum();
    Some((total / priced.len() as f64).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceComponent;
    use chrono::NaiveDate;

    fn component(name: &str, title: &str, total: f64) -> PriceComponent {
        PriceComponent {
            name: name.to_string(),
            title: title.to_string(),
            total,
            is_deleted: false,
            is_included_in_total_price: true,
        }
    }

    #[test]
    fn base_rate_is_relabeled_per_night() {
        let quote = PriceQuote {
            total_price: 350.0,
            components: vec![
                component("baseRate", "Base rate", 300.0),
                component("cleaningFee", "Cleaning fee", 50.0),
            ],
        };
        let lines = build_price_lines(&quote, 3, 0.0);
        assert_eq!(lines[0].label, "$100 x 3 nights");
        assert_eq!(lines[0].amount, 300);
        assert_eq!(lines[1].label, "Cleaning fee");
        assert_eq!(lines[1].amount, 50);
    }

    #[test]
    fn deleted_and_excluded_components_are_dropped() {
        let mut deleted = component("tax", "Tax", 20.0);
        deleted.is_deleted = true;
        let mut excluded = component("hold", "Hold", 99.0);
        excluded.is_included_in_total_price = false;
        let quote = PriceQuote {
            total_price: 300.0,
            components: vec![component("baseRate", "Base rate", 300.0), deleted, excluded],
        };
        let lines = build_price_lines(&quote, 2, 0.0);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn negative_totals_render_as_discounts() {
        let quote = PriceQuote {
            total_price: 270.0,
            components: vec![
                component("baseRate", "Base rate", 300.0),
                component("weeklyDiscount", "Weekly discount", -30.0),
            ],
        };
        let lines = build_price_lines(&quote, 3, 0.0);
        assert!(lines[1].is_discount);
        assert_eq!(lines[1].amount, 30);
    }

    #[test]
    fn deposit_line_is_appended_from_listing_config() {
        let quote = PriceQuote {
            total_price: 300.0,
            components: vec![component("baseRate", "Base rate", 300.0)],
        };
        let lines = build_price_lines(&quote, 2, 150.0);
        let deposit = lines.last().unwrap();
        assert_eq!(deposit.label, "Refundable Damage Deposit");
        assert_eq!(deposit.amount, 150);
        assert!(!deposit.is_discount);

        // Zero deposit: no line
        let lines = build_price_lines(&quote, 2, 0.0);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn per_night_rounds_to_nearest_dollar() {
        assert_eq!(price_per_night(350.0, 3), 117);
        assert_eq!(price_per_night(299.0, 2), 150);
        assert_eq!(price_per_night(100.0, 0), 0);
    }

    #[test]
    fn format_price_groups_thousands() {
        assert_eq!(format_price(950.0), "950");
        assert_eq!(format_price(1234.0), "1,234");
        assert_eq!(format_price(1234567.4), "1,234,567");
        assert_eq!(format_price(-1250.0), "-1,250");
    }

    #[test]
    fn average_rate_ignores_unavailable_and_unpriced_days() {
        let day = |d: u32, available: bool, price: Option<f64>| CalendarDay {
            date: NaiveDate::from_ymd_opt(2026, 3, d).unwrap(),
            is_available: available,
            price,
        };
        let days = vec![
            day(1, true, Some(100.0)),
            day(2, true, Some(200.0)),
            day(3, false, Some(500.0)),
            day(4, true, None),
            day(5, true, Some(0.0)),
        ];
        assert_eq!(average_nightly_rate(&days), Some(150));
        assert_eq!(average_nightly_rate(&[day(1, false, None)]), None);
    }
}
