//! Stage 3b: authenticity scoring.

use std::time::Duration;

use serde::Deserialize;
use tracing::instrument;

use crate::config::ModelSettings;
use crate::domain::card::models::authenticity::{AuthenticityResult, AuthenticitySignals};
use crate::domain::card::models::card_metadata::CardMetadata;
use crate::domain::card::models::feature_envelope::FeatureEnvelope;
use crate::domain::card::models::unit::UnitInterval;

use super::phash::perceptual_hash;
use super::signals::{
    border_consistency_confidence, font_validation_confidence, holo_pattern_confidence,
    text_match_confidence, visual_hash_confidence,
};
use crate::domain::pipeline::errors::LlmError;
use crate::domain::pipeline::llm_json::parse_llm_json;
use crate::domain::pipeline::ports::{LanguageModelPort, ReferenceHashStore};
use crate::domain::pipeline::retry::{Classification, RetryPolicy};

#[derive(Debug, Deserialize)]
struct RawJudgment {
    authenticity_score: f64,
    fake_detected: bool,
    rationale: String,
}

/// Whether holo variance is expected for this card, derived from rarity
/// when known.
fn expects_holo(rarity: Option<&str>) -> bool {
    const HOLO_RARITIES: &[&str] = &[
        "holo", "ultra rare", "secret rare", "rainbow rare", "full art", "vmax", "vstar", "ex",
        "gx",
    ];
    rarity
        .map(|r| {
            let lower = r.to_lowercase();
            HOLO_RARITIES.iter().any(|kw| lower.contains(kw))
        })
        .unwrap_or(false)
}

pub struct AuthenticityScorer<L, R> {
    language_model: L,
    reference_hashes: R,
    model_settings: ModelSettings,
    reference_default: f64,
}

impl<L: LanguageModelPort, R: ReferenceHashStore> AuthenticityScorer<L, R> {
    pub fn new(
        language_model: L,
        reference_hashes: R,
        model_settings: ModelSettings,
        reference_default: f64,
    ) -> Self {
        Self {
            language_model,
            reference_hashes,
            model_settings,
            reference_default,
        }
    }

    #[instrument(skip(self, envelope, image_bytes), fields(stage = "authenticity"))]
    pub async fn score(
        &self,
        envelope: &FeatureEnvelope,
        metadata: &CardMetadata,
        image_bytes: &[u8],
    ) -> AuthenticityResult {
        let card_name = metadata.name.resolved_value();
        let rarity = metadata.rarity.resolved_value();

        let card_hash = perceptual_hash(image_bytes).unwrap_or_default();
        let reference_hashes = match &card_name {
            Some(name) => self
                .reference_hashes
                .hashes_for(name)
                .await
                .unwrap_or_default(),
            None => Vec::new(),
        };
        let visual_hash = visual_hash_confidence(&card_hash, &reference_hashes, self.reference_default);

        let ocr_text: String = envelope
            .ocr_blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let text_match = text_match_confidence(
            &ocr_text,
            card_name.as_deref(),
            envelope.average_ocr_confidence(),
        );

        let holo_pattern =
            holo_pattern_confidence(envelope.holographic_variance, expects_holo(rarity.as_deref()));
        let border_consistency = border_consistency_confidence(envelope);
        let font_validation = font_validation_confidence(envelope);

        let signals = AuthenticitySignals {
            visual_hash: UnitInterval::clamp(visual_hash),
            text_match: UnitInterval::clamp(text_match),
            holo_pattern: UnitInterval::clamp(holo_pattern),
            border_consistency: UnitInterval::clamp(border_consistency),
            font_validation: UnitInterval::clamp(font_validation),
        };

        match self.final_judgment(card_name.as_deref(), signals).await {
            Some((score, fake_detected, rationale)) => AuthenticityResult {
                authenticity_score: score,
                fake_detected,
                rationale,
                signals,
                verified_by_ai: true,
            },
            None => AuthenticityResult::fallback(signals),
        }
    }

    async fn final_judgment(
        &self,
        card_name: Option<&str>,
        signals: AuthenticitySignals,
    ) -> Option<(UnitInterval, bool, String)> {
        let prompt = format!(
            "Judge the authenticity of this card. Name: {}. Signals: visual_hash={:.2}, \
             text_match={:.2}, holo_pattern={:.2}, border_consistency={:.2}, \
             font_validation={:.2}. Respond with JSON: {{authenticity_score, fake_detected, \
             rationale}}.",
            card_name.unwrap_or("unknown"),
            signals.visual_hash.get(),
            signals.text_match.get(),
            signals.holo_pattern.get(),
            signals.border_consistency.get(),
            signals.font_validation.get(),
        );

        let policy = RetryPolicy {
            max_attempts: self.model_settings.max_retries,
            base_delay: Duration::from_secs(2),
            rate_limited_base_delay: Duration::from_secs(4),
            jitter_fraction: 0.5,
            max_wait: Duration::from_secs(30),
        };
        let settings = self.model_settings;

        let response = policy
            .run(
                |error: &LlmError| match error {
                    LlmError::SchemaViolation(_) => Classification::GiveUp,
                    LlmError::SourceUnavailable(_) => Classification::Retry {
                        rate_limited: false,
                    },
                },
                || {
                    let prompt = prompt.clone();
                    async { self.language_model.complete(prompt, settings).await }
                },
            )
            .await
            .ok()?;

        let parsed: RawJudgment = parse_llm_json(&response).ok()?;
        let score = UnitInterval::new(parsed.authenticity_score).ok()?;
        Some((score, parsed.fake_detected, parsed.rationale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holo_rarity_keywords_are_recognized() {
        assert!(expects_holo(Some("Holo Rare")));
        assert!(expects_holo(Some("VMAX")));
        assert!(!expects_holo(Some("Common")));
        assert!(!expects_holo(None));
    }
}
