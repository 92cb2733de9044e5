//! Valuation over filtered comps.

use itertools::Itertools;

use crate::domain::card::models::comps::NormalizedComp;
use crate::domain::card::models::pricing::PricingResult;
use crate::domain::card::models::unit::{NonNegativeUsd, UnitInterval};

use super::stats::{coefficient_of_variation, percentile};

/// Builds a `PricingResult` from the (already outlier-filtered) comps and
/// the unfiltered comps-count/sources used for reporting.
pub fn value(filtered: &[NormalizedComp], window_days: u32) -> PricingResult {
    if filtered.is_empty() {
        return PricingResult::empty(window_days, "No pricing data available from any source");
    }

    let mut prices: Vec<f64> = filtered.iter().map(|c| c.price_usd).collect();
    prices.sort_by(|a, b| a.total_cmp(b));

    let value_low = percentile(&prices, 10.0);
    let value_median = percentile(&prices, 50.0);
    let value_high = percentile(&prices, 90.0);
    let volatility = coefficient_of_variation(&prices);
    let confidence = 0.6 * (prices.len() as f64 / 50.0).min(1.0) + 0.4 * (1.0 - volatility).max(0.0);

    let sources: Vec<String> = filtered
        .iter()
        .map(|c| c.source.clone())
        .unique()
        .collect();

    PricingResult {
        value_low: NonNegativeUsd::new(value_low).unwrap_or(NonNegativeUsd::ZERO),
        value_median: NonNegativeUsd::new(value_median).unwrap_or(NonNegativeUsd::ZERO),
        value_high: NonNegativeUsd::new(value_high).unwrap_or(NonNegativeUsd::ZERO),
        comps_count: filtered.len() as u32,
        window_days,
        sources,
        confidence: UnitInterval::clamp(confidence),
        volatility,
        message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::models::comps::Condition;
    use chrono::Utc;

    fn comp(source: &str, price: f64) -> NormalizedComp {
        NormalizedComp {
            source: source.to_string(),
            price_usd: price,
            condition: Condition::NearMint,
            sold_date: Utc::now(),
            listing_url: None,
        }
    }

    #[test]
    fn empty_comps_yields_zeroed_result_with_message() {
        let result = value(&[], 14);
        assert_eq!(result.value_median.get(), 0.0);
        assert_eq!(result.comps_count, 0);
        assert!(result.message.is_some());
        assert_eq!(result.confidence.get(), 0.0);
    }

    #[test]
    fn sources_are_deduplicated() {
        let comps = vec![
            comp("tcgplayer", 10.0),
            comp("tcgplayer", 12.0),
            comp("ebay", 11.0),
        ];
        let result = value(&comps, 14);
        assert_eq!(result.sources.len(), 2);
    }

    #[test]
    fn source_completion_order_does_not_affect_result() {
        let forward = vec![comp("a", 10.0), comp("b", 20.0), comp("c", 30.0)];
        let mut reversed = forward.clone();
        reversed.reverse();

        let r1 = value(&forward, 14);
        let r2 = value(&reversed, 14);
        assert_eq!(r1.value_median.get(), r2.value_median.get());
        assert_eq!(r1.value_low.get(), r2.value_low.get());
        assert_eq!(r1.value_high.get(), r2.value_high.get());
    }
}
