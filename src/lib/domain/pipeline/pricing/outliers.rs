//! Tukey IQR outlier removal.

use crate::domain::card::models::comps::NormalizedComp;

use super::stats::percentile;

/// Filters comps by price using the Tukey IQR rule. Skips filtering when
/// there are fewer than 4 comps. If the filter would empty the set, reverts
/// to the unfiltered input.
pub fn remove_outliers(mut comps: Vec<NormalizedComp>) -> Vec<NormalizedComp> {
    if comps.len() < 4 {
        return comps;
    }
    comps.sort_by(|a, b| a.price_usd.total_cmp(&b.price_usd));
    let prices: Vec<f64> = comps.iter().map(|c| c.price_usd).collect();
    let q1 = percentile(&prices, 25.0);
    let q3 = percentile(&prices, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let filtered: Vec<NormalizedComp> = comps
        .iter()
        .filter(|c| c.price_usd >= lower && c.price_usd <= upper)
        .cloned()
        .collect();

    if filtered.is_empty() {
        tracing::warn!("IQR filter emptied the comp set; reverting to unfiltered comps");
        comps
    } else {
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::models::comps::Condition;
    use chrono::Utc;

    fn comp(price: f64) -> NormalizedComp {
        NormalizedComp {
            source: "tcgplayer".to_string(),
            price_usd: price,
            condition: Condition::NearMint,
            sold_date: Utc::now(),
            listing_url: None,
        }
    }

    #[test]
    fn skips_filtering_below_four_comps() {
        let comps = vec![comp(1.0), comp(1000.0), comp(2.0)];
        let result = remove_outliers(comps.clone());
        assert_eq!(result.len(), comps.len());
    }

    #[test]
    fn drops_values_outside_iqr_bounds_at_four_comps() {
        let comps = vec![comp(10.0), comp(11.0), comp(12.0), comp(1000.0)];
        let result = remove_outliers(comps);
        assert!(!result.iter().any(|c| c.price_usd == 1000.0));
    }

    #[test]
    fn is_idempotent_on_an_already_filtered_set() {
        let comps = vec![comp(10.0), comp(11.0), comp(12.0), comp(13.0)];
        let once = remove_outliers(comps);
        let twice = remove_outliers(once.clone());
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn reverts_to_unfiltered_when_filter_would_empty_the_set() {
        // Highly skewed so IQR bounds could in principle reject everything;
        // removeOutliers must never return an empty vec for a non-empty input.
        let comps = vec![comp(1.0), comp(1.0), comp(1.0), comp(1.0)];
        let result = remove_outliers(comps.clone());
        assert_eq!(result.len(), comps.len());
    }
}
