//! The persisted `Card` record, the system's source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::authenticity::AuthenticityResult;
use super::card_metadata::CardMetadata;
use super::pricing::{PricingResult, ValuationSummary};
use super::unit::UnitInterval;

/// Identification fields promoted onto the card once OCR output is
/// AI-verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identification {
    pub name: String,
    pub set: Option<String>,
    pub rarity: Option<String>,
    pub collector_number: Option<String>,
    pub condition_estimate: Option<String>,
    pub id_confidence: UnitInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingFields {
    pub value_low: f64,
    pub value_median: f64,
    pub value_high: f64,
    pub comps_count: u32,
    pub sources: Vec<String>,
    pub pricing_message: Option<String>,
    pub valuation_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticityFields {
    pub authenticity_score: UnitInterval,
    pub authenticity_signals: super::authenticity::AuthenticitySignals,
}

#[derive(Debug, Error)]
#[error("card invariant violated: {0}")]
pub struct CardInvariantViolation(pub String);

/// The persisted card record. Identified by `(user_id, card_id)`; exclusively
/// owned by its user. Created by the create-card collaborator (out of
/// scope); mutated only by the result aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    pub front_image_ref: String,
    pub back_image_ref: Option<String>,

    pub identification: Option<Identification>,
    pub pricing: Option<PricingFields>,
    pub authenticity: Option<AuthenticityFields>,

    /// Raw OCR metadata, always stored when produced even if unverified.
    pub ocr_metadata: Option<CardMetadata>,
}

impl Card {
    /// Checks the card's cross-field invariants: price ordering, and that
    /// unverified OCR output was never promoted to identification.
    pub fn check_invariants(&self) -> Result<(), CardInvariantViolation> {
        if let Some(pricing) = &self.pricing {
            if !(pricing.value_low <= pricing.value_median && pricing.value_median <= pricing.value_high)
            {
                return Err(CardInvariantViolation(format!(
                    "value_low ({}) <= value_median ({}) <= value_high ({}) violated",
                    pricing.value_low, pricing.value_median, pricing.value_high
                )));
            }
        }
        Ok(())
    }

    /// A card is terminal once it carries both pricing and authenticity
    /// results from the same valuation run.
    pub fn is_terminal(&self) -> bool {
        self.pricing.is_some() && self.authenticity.is_some()
    }

    pub fn apply_valuation(
        &mut self,
        ocr_metadata: Option<CardMetadata>,
        pricing_result: &PricingResult,
        valuation_summary: &ValuationSummary,
        authenticity_result: &AuthenticityResult,
        now: DateTime<Utc>,
    ) {
        // Rule 1: pricing and authenticity are always copied.
        self.pricing = Some(PricingFields {
            value_low: pricing_result.value_low.get(),
            value_median: pricing_result.value_median.get(),
            value_high: pricing_result.value_high.get(),
            comps_count: pricing_result.comps_count,
            sources: pricing_result.sources.clone(),
            pricing_message: pricing_result.message.clone(),
            valuation_summary: valuation_summary.summary.clone(),
        });
        self.authenticity = Some(AuthenticityFields {
            authenticity_score: authenticity_result.authenticity_score,
            authenticity_signals: authenticity_result.signals,
        });

        // Rule 3: identification is only promoted when AI-verified and non-null.
        if let Some(metadata) = &ocr_metadata {
            if metadata.verified_by_ai {
                if let Some(name) = metadata.name.resolved_value() {
                    self.identification = Some(Identification {
                        name,
                        set: metadata.set.resolved_value(),
                        rarity: metadata.rarity.resolved_value(),
                        collector_number: metadata.collector_number.resolved_value(),
                        condition_estimate: metadata.condition_estimate.resolved_value(),
                        id_confidence: metadata.overall_confidence,
                    });
                }
            }
        }

        // Rule 2: OCR metadata is always stored, verified or not.
        self.ocr_metadata = ocr_metadata;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::models::authenticity::AuthenticitySignals;
    use crate::domain::card::models::pricing::Trend;
    use crate::domain::card::models::unit::NonNegativeUsd;

    fn base_card() -> Card {
        Card {
            user_id: Uuid::new_v4(),
            card_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            front_image_ref: "images/front.jpg".to_string(),
            back_image_ref: None,
            identification: None,
            pricing: None,
            authenticity: None,
            ocr_metadata: None,
        }
    }

    fn signals() -> AuthenticitySignals {
        AuthenticitySignals {
            visual_hash: UnitInterval::clamp(0.8),
            text_match: UnitInterval::clamp(0.8),
            holo_pattern: UnitInterval::clamp(0.8),
            border_consistency: UnitInterval::clamp(0.8),
            font_validation: UnitInterval::clamp(0.8),
        }
    }

    #[test]
    fn unverified_ocr_never_promotes_identification() {
        let mut card = base_card();
        let ocr = CardMetadata::fallback(Some("Charizard"), 0.9);
        assert!(!ocr.verified_by_ai);

        let pricing = PricingResult::empty(14, "no comps found");
        let valuation = ValuationSummary::synthesize_fallback(&pricing);
        let authenticity = AuthenticityResult::fallback(signals());

        card.apply_valuation(Some(ocr), &pricing, &valuation, &authenticity, Utc::now());

        assert!(card.identification.is_none());
        assert!(card.ocr_metadata.is_some());
    }

    #[test]
    fn verified_ocr_promotes_identification_fields() {
        let mut card = base_card();
        use crate::domain::card::models::field_value::FieldValue;
        let ocr = CardMetadata {
            name: FieldValue::Single {
                value: Some("Charizard".to_string()),
                confidence: UnitInterval::clamp(0.95),
                rationale: "exact match".to_string(),
            },
            set: FieldValue::Single {
                value: Some("Base Set".to_string()),
                confidence: UnitInterval::clamp(0.9),
                rationale: "matched symbol".to_string(),
            },
            rarity: FieldValue::Single {
                value: None,
                confidence: UnitInterval::clamp(0.0),
                rationale: "not found".to_string(),
            },
            collector_number: FieldValue::Single {
                value: None,
                confidence: UnitInterval::clamp(0.0),
                rationale: "not found".to_string(),
            },
            illustrator: FieldValue::Single {
                value: None,
                confidence: UnitInterval::clamp(0.0),
                rationale: "not found".to_string(),
            },
            condition_estimate: FieldValue::Single {
                value: None,
                confidence: UnitInterval::clamp(0.0),
                rationale: "not found".to_string(),
            },
            overall_confidence: UnitInterval::clamp(0.9),
            reasoning_trail: "matched canonical name and set symbol".to_string(),
            verified_by_ai: true,
            extracted_at: Utc::now(),
        };

        let pricing = PricingResult {
            value_low: NonNegativeUsd::new(10.0).unwrap(),
            value_median: NonNegativeUsd::new(20.0).unwrap(),
            value_high: NonNegativeUsd::new(30.0).unwrap(),
            comps_count: 5,
            window_days: 14,
            sources: vec!["tcgplayer".into()],
            confidence: UnitInterval::clamp(0.8),
            volatility: 0.1,
            message: None,
        };
        let valuation = ValuationSummary {
            summary: "steady".to_string(),
            fair_value: pricing.value_median,
            trend: Trend::Stable,
            recommendation: "hold".to_string(),
            confidence: UnitInterval::clamp(0.8),
        };
        let authenticity = AuthenticityResult::fallback(signals());

        card.apply_valuation(Some(ocr), &pricing, &valuation, &authenticity, Utc::now());

        let identification = card.identification.expect("identification promoted");
        assert_eq!(identification.name, "Charizard");
        assert_eq!(identification.set.as_deref(), Some("Base Set"));
    }

    #[test]
    fn invariant_check_rejects_out_of_order_pricing() {
        let mut card = base_card();
        card.pricing = Some(PricingFields {
            value_low: 30.0,
            value_median: 20.0,
            value_high: 10.0,
            comps_count: 1,
            sources: vec![],
            pricing_message: None,
            valuation_summary: String::new(),
        });
        assert!(card.check_invariants().is_err());
    }

    #[test]
    fn is_terminal_requires_both_pricing_and_authenticity() {
        let card = base_card();
        assert!(!card.is_terminal());
    }
}
