//! Internal pricing entities: raw comps from source adapters and their
//! normalized form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    Poor,
    Good,
    Excellent,
    NearMint,
    Mint,
}

impl Condition {
    /// Standardizes a free-text condition string by case-insensitive
    /// substring matching, checked in the listed precedence order.
    pub fn normalize(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        // "near mint" is checked ahead of the bare "mint" substring so it
        // doesn't fall through to the Mint tier.
        const NEAR_MINT: &[&str] = &["near mint", "nm", "like new"];
        const MINT: &[&str] = &["gem", "pristine", "mint"];
        const EXCELLENT: &[&str] = &["excellent", "lightly played", "lp"];
        const GOOD: &[&str] = &["good", "played", "moderately played", "mp"];
        const POOR: &[&str] = &["poor", "damaged", "heavily played", "hp"];

        if NEAR_MINT.iter().any(|needle| lower.contains(needle)) {
            Condition::NearMint
        } else if MINT.iter().any(|needle| lower.contains(needle)) {
            Condition::Mint
        } else if EXCELLENT.iter().any(|needle| lower.contains(needle)) {
            Condition::Excellent
        } else if GOOD.iter().any(|needle| lower.contains(needle)) {
            Condition::Good
        } else if POOR.iter().any(|needle| lower.contains(needle)) {
            Condition::Poor
        } else {
            Condition::Good
        }
    }
}

/// A comp as returned directly by a pricing source adapter, before
/// normalization.
#[derive(Debug, Clone)]
pub struct RawComp {
    pub source: String,
    pub price: f64,
    pub currency: String,
    pub condition: String,
    pub sold_date: DateTime<Utc>,
    pub listing_url: Option<String>,
}

/// A comp after currency conversion and condition standardization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedComp {
    pub source: String,
    pub price_usd: f64,
    pub condition: Condition,
    pub sold_date: DateTime<Utc>,
    pub listing_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_applies_grading_precedence() {
        assert_eq!(Condition::normalize("NM"), Condition::NearMint);
        assert_eq!(Condition::normalize("Gem Mint 10"), Condition::Mint);
        assert_eq!(Condition::normalize("Lightly Played"), Condition::Excellent);
        assert_eq!(Condition::normalize("Heavily Played"), Condition::Poor);
        assert_eq!(Condition::normalize("whatever"), Condition::Good);
    }

    #[test]
    fn near_mint_phrase_takes_precedence_over_bare_mint_substring() {
        assert_eq!(Condition::normalize("Near Mint"), Condition::NearMint);
        assert_eq!(Condition::normalize("Mint"), Condition::Mint);
    }
}
