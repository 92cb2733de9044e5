//! Raw-comp normalization.

use crate::domain::card::models::comps::{Condition, NormalizedComp, RawComp};

/// Fixed currency-to-USD conversion table. Unknown
/// currencies are logged and treated as USD.
fn usd_rate(currency: &str) -> f64 {
    match currency.to_uppercase().as_str() {
        "USD" => 1.0,
        "EUR" => 1.08,
        "GBP" => 1.27,
        "CAD" => 0.73,
        "AUD" => 0.65,
        "JPY" => 0.0067,
        other => {
            tracing::warn!(currency = other, "unknown currency, treating as USD");
            1.0
        }
    }
}

/// Converts and standardizes one raw comp; `None` when the comp should be
/// discarded (non-positive or non-finite price).
pub fn normalize(raw: RawComp) -> Option<NormalizedComp> {
    let rate = usd_rate(&raw.currency);
    let price_usd = raw.price * rate;
    if !price_usd.is_finite() || price_usd <= 0.0 {
        return None;
    }
    Some(NormalizedComp {
        source: raw.source,
        price_usd,
        condition: Condition::normalize(&raw.condition),
        sold_date: raw.sold_date,
        listing_url: raw.listing_url,
    })
}

pub fn normalize_all(raws: impl IntoIterator<Item = RawComp>) -> Vec<NormalizedComp> {
    raws.into_iter().filter_map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn raw(price: f64, currency: &str) -> RawComp {
        RawComp {
            source: "tcgplayer".to_string(),
            price,
            currency: currency.to_string(),
            condition: "Near Mint".to_string(),
            sold_date: Utc::now(),
            listing_url: None,
        }
    }

    #[test]
    fn converts_eur_to_usd() {
        let normalized = normalize(raw(100.0, "EUR")).unwrap();
        assert!((normalized.price_usd - 108.0).abs() < 1e-9);
    }

    #[test]
    fn usd_to_usd_is_identity() {
        let normalized = normalize(raw(42.0, "USD")).unwrap();
        assert_eq!(normalized.price_usd, 42.0);
    }

    #[test]
    fn discards_non_positive_price() {
        assert!(normalize(raw(0.0, "USD")).is_none());
        assert!(normalize(raw(-5.0, "USD")).is_none());
    }

    #[test]
    fn unknown_currency_treated_as_usd() {
        let normalized = normalize(raw(10.0, "XYZ")).unwrap();
        assert_eq!(normalized.price_usd, 10.0);
    }
}
