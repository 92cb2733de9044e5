//! Stage 3b output: multi-signal authenticity scoring.

use serde::{Deserialize, Serialize};

use super::unit::UnitInterval;

/// The five independent authenticity signals, each a confidence in `[0,1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthenticitySignals {
    pub visual_hash: UnitInterval,
    pub text_match: UnitInterval,
    pub holo_pattern: UnitInterval,
    pub border_consistency: UnitInterval,
    pub font_validation: UnitInterval,
}

impl AuthenticitySignals {
    /// Weighted average used as the fallback score when the final language
    /// model judgment is exhausted.
    pub const WEIGHTS: [f64; 5] = [0.30, 0.25, 0.20, 0.15, 0.10];

    pub fn weighted_average(&self) -> f64 {
        let values = [
            self.visual_hash.get(),
            self.text_match.get(),
            self.holo_pattern.get(),
            self.border_consistency.get(),
            self.font_validation.get(),
        ];
        values
            .iter()
            .zip(Self::WEIGHTS.iter())
            .map(|(v, w)| v * w)
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticityResult {
    pub authenticity_score: UnitInterval,
    pub fake_detected: bool,
    pub rationale: String,
    pub signals: AuthenticitySignals,
    pub verified_by_ai: bool,
}

impl AuthenticityResult {
    /// Fallback result when the final language-model judgment call is
    /// exhausted after retries.
    pub fn fallback(signals: AuthenticitySignals) -> Self {
        let score = UnitInterval::clamp(signals.weighted_average());
        Self {
            fake_detected: score.get() <= 0.50,
            authenticity_score: score,
            rationale: "AI analysis unavailable. Manual review recommended.".to_string(),
            signals,
            verified_by_ai: false,
        }
    }
}
