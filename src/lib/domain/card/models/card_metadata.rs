//! Structured card identification produced by the OCR reasoner.

use serde::{Deserialize, Serialize};

use super::field_value::FieldValue;
use super::unit::UnitInterval;
use chrono::{DateTime, Utc};

/// Structured card identification with per-field confidence and rationale.
///
/// This is stored on the [`super::card::Card`] record whenever it is
/// produced, even when `verified_by_ai` is false — it's kept for audit/debug
///, while the identification fields it
/// describes are only promoted onto the card when `verified_by_ai` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardMetadata {
    pub name: FieldValue<String>,
    pub set: FieldValue<String>,
    pub rarity: FieldValue<String>,
    pub collector_number: FieldValue<String>,
    pub illustrator: FieldValue<String>,
    pub condition_estimate: FieldValue<String>,
    pub overall_confidence: UnitInterval,
    pub reasoning_trail: String,
    pub verified_by_ai: bool,
    pub extracted_at: DateTime<Utc>,
}

impl CardMetadata {
    /// Builds the fallback metadata produced when the language model is
    /// exhausted or returns schema-invalid output.
    pub fn fallback(top_ocr_block_text: Option<&str>, top_ocr_block_confidence: f64) -> Self {
        let name_confidence = UnitInterval::clamp(top_ocr_block_confidence * 0.7);
        let empty = |rationale: &str| FieldValue::Single {
            value: None,
            confidence: UnitInterval::clamp(0.0),
            rationale: rationale.to_string(),
        };
        let name = match top_ocr_block_text {
            Some(text) => FieldValue::Single {
                value: Some(text.to_string()),
                confidence: name_confidence,
                rationale: "Fallback: top OCR block, AI reasoning unavailable".to_string(),
            },
            None => empty("Fallback: AI reasoning unavailable"),
        };
        let overall_confidence = UnitInterval::clamp(
            top_ocr_block_text
                .map(|_| (name_confidence.get() * 0.5).max(0.0))
                .unwrap_or(0.0),
        );
        Self {
            name,
            set: empty("Fallback: AI reasoning unavailable"),
            rarity: empty("Fallback: AI reasoning unavailable"),
            collector_number: empty("Fallback: AI reasoning unavailable"),
            illustrator: empty("Fallback: AI reasoning unavailable"),
            condition_estimate: empty("Fallback: AI reasoning unavailable"),
            overall_confidence,
            reasoning_trail: "AI reasoning unavailable; used fallback heuristic.".to_string(),
            verified_by_ai: false,
            extracted_at: Utc::now(),
        }
    }
}

/// An audit-trail summary of [`CardMetadata`] suitable for embedding in the
/// `CardValuationCompleted` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSummary {
    pub name: Option<String>,
    pub set: Option<String>,
    pub overall_confidence: f64,
    pub verified_by_ai: bool,
}

impl From<&CardMetadata> for OcrSummary {
    fn from(metadata: &CardMetadata) -> Self {
        Self {
            name: metadata.name.resolved_value(),
            set: metadata.set.resolved_value(),
            overall_confidence: metadata.overall_confidence.get(),
            verified_by_ai: metadata.verified_by_ai,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_never_verified_by_ai() {
        let metadata = CardMetadata::fallback(Some("Charizard"), 0.8);
        assert!(!metadata.verified_by_ai);
        assert_eq!(metadata.name.resolved_value(), Some("Charizard".into()));
        assert!((metadata.name.confidence().get() - 0.56).abs() < 1e-9);
        assert!(metadata.set.resolved_value().is_none());
    }

    #[test]
    fn fallback_with_no_ocr_blocks_is_fully_unknown() {
        let metadata = CardMetadata::fallback(None, 0.0);
        assert_eq!(metadata.overall_confidence.get(), 0.0);
        assert!(metadata.name.resolved_value().is_none());
    }
}
