//! Stage 3a output: aggregated market pricing.

use serde::{Deserialize, Serialize};

use super::unit::{NonNegativeUsd, UnitInterval};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

/// Query parameters for a pricing run.
#[derive(Debug, Clone)]
pub struct PriceQuery {
    pub card_name: String,
    pub set: Option<String>,
    pub number: Option<String>,
    pub condition: Option<String>,
    /// Rarity hint (caller-supplied `expectedRarity` or the OCR'd rarity
    /// field), used by source adapters to pick the correct price variant.
    pub rarity: Option<String>,
    pub window_days: u32,
}

/// The price variant a source adapter should select for a comp listing,
/// derived from [`PriceQuery::rarity`] by keyword match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceVariant {
    Holofoil,
    ReverseHolofoil,
    FirstEdition,
    Normal,
}

impl PriceQuery {
    /// Selects the price variant implied by `rarity`: "reverse" ->
    /// reverse-holofoil; "1st edition" -> 1st-edition; holo/ultra
    /// rare/secret rare/rainbow rare/full art/vmax/vstar/ex/gx -> holofoil;
    /// anything else (including no rarity hint) -> normal.
    pub fn price_variant(&self) -> PriceVariant {
        let Some(rarity) = self.rarity.as_deref() else {
            return PriceVariant::Normal;
        };
        let rarity = rarity.to_lowercase();

        if rarity.contains("reverse") {
            return PriceVariant::ReverseHolofoil;
        }
        if rarity.contains("1st edition") {
            return PriceVariant::FirstEdition;
        }
        const HOLO_KEYWORDS: &[&str] = &[
            "holo",
            "ultra rare",
            "secret rare",
            "rainbow rare",
            "full art",
            "vmax",
            "vstar",
            "ex",
            "gx",
        ];
        if HOLO_KEYWORDS.iter().any(|k| rarity.contains(k)) {
            return PriceVariant::Holofoil;
        }
        PriceVariant::Normal
    }
}

impl PriceVariant {
    /// The variant to retry with when the primary variant has no listings;
    /// `None` for variants that already are the fallback.
    pub fn fallback(self) -> Option<Self> {
        match self {
            PriceVariant::Normal => Some(PriceVariant::Holofoil),
            _ => None,
        }
    }

    /// The source-facing query parameter value for this variant.
    pub fn as_query_param(self) -> &'static str {
        match self {
            PriceVariant::Holofoil => "holofoil",
            PriceVariant::ReverseHolofoil => "reverse-holofoil",
            PriceVariant::FirstEdition => "1st-edition",
            PriceVariant::Normal => "normal",
        }
    }
}

impl PriceQuery {
    pub const DEFAULT_WINDOW_DAYS: u32 = 14;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingResult {
    pub value_low: NonNegativeUsd,
    pub value_median: NonNegativeUsd,
    pub value_high: NonNegativeUsd,
    pub comps_count: u32,
    pub window_days: u32,
    pub sources: Vec<String>,
    pub confidence: UnitInterval,
    pub volatility: f64,
    pub message: Option<String>,
}

impl PricingResult {
    /// The zero-valued result returned when no comps are available.
    pub fn empty(window_days: u32, message: impl Into<String>) -> Self {
        Self {
            value_low: NonNegativeUsd::ZERO,
            value_median: NonNegativeUsd::ZERO,
            value_high: NonNegativeUsd::ZERO,
            comps_count: 0,
            window_days,
            sources: Vec::new(),
            confidence: UnitInterval::clamp(0.0),
            volatility: 0.0,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub summary: String,
    pub fair_value: NonNegativeUsd,
    pub trend: Trend,
    pub recommendation: String,
    pub confidence: UnitInterval,
}

impl ValuationSummary {
    /// Synthesized summary produced when the language model call fails.
    pub fn synthesize_fallback(pricing: &PricingResult) -> Self {
        let summary = format!(
            "Based on {} comps over the last {} days, prices range from ${:.2} to ${:.2} with a median of ${:.2}.",
            pricing.comps_count,
            pricing.window_days,
            pricing.value_low.get(),
            pricing.value_high.get(),
            pricing.value_median.get(),
        );
        Self {
            summary,
            fair_value: pricing.value_median,
            trend: Trend::Stable,
            recommendation: "manual review recommended".to_string(),
            confidence: UnitInterval::clamp(pricing.confidence.get() * 0.7),
        }
    }
}
