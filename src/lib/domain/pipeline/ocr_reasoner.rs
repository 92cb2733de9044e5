//! Stage 2: OCR reasoning.

use serde::Deserialize;
use tracing::instrument;

use crate::config::ModelSettings;
use crate::domain::card::models::card_metadata::CardMetadata;
use crate::domain::card::models::feature_envelope::{FeatureEnvelope, OcrBlock, OcrRegion};
use crate::domain::card::models::field_value::{Candidate, FieldValue};
use crate::domain::card::models::unit::UnitInterval;

use super::errors::LlmError;
use super::llm_json::parse_llm_json;
use super::ports::LanguageModelPort;
use super::retry::{Classification, RetryPolicy};

/// Ability-related words that disqualify an OCR block from the card-name
/// guard.
const ABILITY_KEYWORDS: &[&str] = &[
    "flip", "coin", "heads", "tails", "damage", "attack", "energy", "deck", "discard", "draw",
    "search", "your", "opponent",
];

#[derive(Debug, Deserialize)]
struct RawFieldSingle {
    value: Option<String>,
    confidence: f64,
    rationale: String,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    value: Option<String>,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSetField {
    MultiCandidate {
        value: Option<String>,
        candidates: Vec<RawCandidate>,
        rationale: String,
    },
    Single(RawFieldSingle),
}

#[derive(Debug, Deserialize)]
struct RawCardMetadata {
    name: RawFieldSingle,
    set: RawSetField,
    rarity: RawFieldSingle,
    collector_number: RawFieldSingle,
    illustrator: RawFieldSingle,
    condition_estimate: RawFieldSingle,
    overall_confidence: f64,
    reasoning_trail: String,
}

pub struct OcrReasoner<L> {
    language_model: L,
    model_settings: ModelSettings,
}

impl<L: LanguageModelPort> OcrReasoner<L> {
    pub fn new(language_model: L, model_settings: ModelSettings) -> Self {
        Self {
            language_model,
            model_settings,
        }
    }

    /// Interprets raw OCR text into structured card metadata. Never returns
    /// `Err` in the sense of failing the pipeline — on model exhaustion or
    /// schema violation it falls back to heuristic metadata, matching the
    /// orchestrator's "OCR Reasoner failure → use fallback" policy.
    #[instrument(skip(self, envelope), fields(stage = "ocr_reasoning"))]
    pub async fn interpret(&self, envelope: &FeatureEnvelope) -> CardMetadata {
        let prompt = build_prompt(envelope);

        // Uniform 1s/2s/4s schedule; schema-invalid
        // responses are not retried.
        let policy = RetryPolicy {
            max_attempts: self.model_settings.max_retries,
            base_delay: std::time::Duration::from_secs(1),
            rate_limited_base_delay: std::time::Duration::from_secs(1),
            jitter_fraction: 0.0,
            max_wait: std::time::Duration::from_secs(4),
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
                    let model_settings = settings;
                    async { self.language_model.complete(prompt, model_settings).await }
                },
            )
            .await;

        let raw_response = match response {
            Ok(text) => text,
            Err(_) => return fallback(envelope),
        };

        match parse_llm_json::<RawCardMetadata>(&raw_response) {
            Ok(parsed) => match into_card_metadata(parsed) {
                Ok(metadata) => apply_name_guard(metadata, envelope),
                Err(_) => fallback(envelope),
            },
            Err(_) => fallback(envelope),
        }
    }
}

fn build_prompt(envelope: &FeatureEnvelope) -> String {
    let mut prompt = String::from(
        "Identify this trading card from OCR text. Respond with JSON matching the CardMetadata \
         schema: name, set, rarity, collector_number, illustrator, condition_estimate (each \
         {value, confidence, rationale}), overall_confidence, reasoning_trail.\n\
         Confidence scale: 0.9-1.0 exact/high-confidence; 0.7-0.9 strong fuzzy; 0.5-0.7 \
         moderate; 0.3-0.5 low; 0.0-0.3 uncertain/unknown.\n\n",
    );
    for (label, region) in [
        ("Top (name/HP)", OcrRegion::Top),
        ("Middle (abilities/flavor)", OcrRegion::Middle),
        ("Bottom (copyright/collector number/illustrator)", OcrRegion::Bottom),
    ] {
        prompt.push_str(&format!("{label}:\n"));
        for block in envelope.blocks_in(region) {
            prompt.push_str(&format!(
                "  \"{}\" (confidence {:.2}, top {:.2}, left {:.2})\n",
                block.text, block.confidence, block.bounding_box.top, block.bounding_box.left
            ));
        }
    }
    prompt.push_str(&format!(
        "\nVisual context: holographic_variance={:.2}, border_symmetry={:.2}, blur={:.2}, glare={}\n",
        envelope.holographic_variance,
        envelope.border_metrics.symmetry_score,
        envelope.image_quality.blur_score,
        envelope.image_quality.glare_detected,
    ));
    prompt
}

fn into_card_metadata(raw: RawCardMetadata) -> Result<CardMetadata, String> {
    let single = |f: RawFieldSingle| -> Result<FieldValue<String>, String> {
        if f.rationale.is_empty() {
            return Err("empty rationale".to_string());
        }
        Ok(FieldValue::Single {
            value: f.value,
            confidence: UnitInterval::new(f.confidence).map_err(|e| e.to_string())?,
            rationale: f.rationale,
        })
    };

    let set = match raw.set {
        RawSetField::Single(f) => single(f)?,
        RawSetField::MultiCandidate {
            value,
            candidates,
            rationale,
        } => {
            if rationale.is_empty() {
                return Err("empty rationale".to_string());
            }
            let candidates = candidates
                .into_iter()
                .map(|c| -> Result<Candidate<String>, String> {
                    Ok(Candidate {
                        value: c.value,
                        confidence: UnitInterval::new(c.confidence).map_err(|e| e.to_string())?,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            FieldValue::MultiCandidate {
                value,
                candidates,
                rationale,
            }
        }
    };

    Ok(CardMetadata {
        name: single(raw.name)?,
        set,
        rarity: single(raw.rarity)?,
        collector_number: single(raw.collector_number)?,
        illustrator: single(raw.illustrator)?,
        condition_estimate: single(raw.condition_estimate)?,
        overall_confidence: UnitInterval::new(raw.overall_confidence).map_err(|e| e.to_string())?,
        reasoning_trail: raw.reasoning_trail,
        verified_by_ai: true,
        extracted_at: chrono::Utc::now(),
    })
}

fn fallback(envelope: &FeatureEnvelope) -> CardMetadata {
    let top = envelope.top_block();
    CardMetadata::fallback(top.map(|b| b.text.as_str()), top.map_or(0.0, |b| b.confidence))
}

/// Anti-regression guard: if the model's chosen name looks clearly wrong,
/// prefer a block matching the name heuristics instead. The model output
/// is otherwise authoritative.
fn apply_name_guard(mut metadata: CardMetadata, envelope: &FeatureEnvelope) -> CardMetadata {
    let model_name = metadata.name.resolved_value();
    let name_is_plausible = model_name
        .as_deref()
        .map(looks_like_a_plausible_name)
        .unwrap_or(false);
    if name_is_plausible {
        return metadata;
    }

    if let Some(candidate) = best_name_candidate(envelope) {
        metadata.name = FieldValue::Single {
            value: Some(candidate.text.clone()),
            confidence: UnitInterval::clamp(candidate.confidence),
            rationale: "Heuristic card-name guard: model output rejected".to_string(),
        };
    }
    metadata
}

fn looks_like_a_plausible_name(name: &str) -> bool {
    let word_count = name.split_whitespace().count();
    (1..=4).contains(&word_count) && name.len() <= 30
}

fn best_name_candidate(envelope: &FeatureEnvelope) -> Option<&OcrBlock> {
    envelope
        .ocr_blocks
        .iter()
        .filter(|block| {
            block.bounding_box.top < 0.40
                && (1..=4).contains(&block.text.split_whitespace().count())
                && block.text.len() <= 30
                && !ABILITY_KEYWORDS
                    .iter()
                    .any(|kw| block.text.to_lowercase().contains(kw))
        })
        .max_by(|a, b| {
            a.bounding_box
                .top
                .partial_cmp(&b.bounding_box.top)
                .unwrap()
                .reverse()
                .then(
                    (a.bounding_box.width * a.bounding_box.height)
                        .partial_cmp(&(b.bounding_box.width * b.bounding_box.height))
                        .unwrap(),
                )
                .then(a.confidence.partial_cmp(&b.confidence).unwrap())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plausible_name_accepts_short_phrases() {
        assert!(looks_like_a_plausible_name("Charizard"));
        assert!(looks_like_a_plausible_name("Dark Charizard VMAX"));
        assert!(!looks_like_a_plausible_name(
            "This is clearly not a card name at all"
        ));
    }
}
