//! The five authenticity signal formulas.

use crate::domain::card::models::feature_envelope::FeatureEnvelope;

use super::phash::hamming_distance;

/// Canonical text fragments every genuine card is expected to carry
/// somewhere in its OCR text.
const CANONICAL_PATTERNS: &[&str] = &[
    "HP", "©", "Pokémon", "Nintendo", "Creatures", "GAME FREAK", "Illus.", "Weakness",
    "Resistance", "Retreat",
];

/// Best-match similarity against stored reference hashes for `card_name`,
/// or the configured neutral default when no name or no references exist.
pub fn visual_hash_confidence(
    card_hash: &str,
    reference_hashes: &[String],
    neutral_default: f64,
) -> f64 {
    reference_hashes
        .iter()
        .filter_map(|reference| hamming_distance(card_hash, reference))
        .map(|distance| (1.0 - distance as f64 / 64.0).max(0.0))
        .fold(None, |best: Option<f64>, similarity| {
            Some(best.map_or(similarity, |b| b.max(similarity)))
        })
        .unwrap_or(neutral_default)
}

pub fn text_match_confidence(
    ocr_text: &str,
    expected_name: Option<&str>,
    average_ocr_confidence: f64,
) -> f64 {
    let lower = ocr_text.to_lowercase();
    let mut total_checks = CANONICAL_PATTERNS.len();
    let mut matches = CANONICAL_PATTERNS
        .iter()
        .filter(|pattern| lower.contains(&pattern.to_lowercase()))
        .count();
    if let Some(name) = expected_name {
        total_checks += 1;
        if lower.contains(&name.to_lowercase()) {
            matches += 1;
        }
    }
    let match_ratio = if total_checks == 0 {
        0.0
    } else {
        matches as f64 / total_checks as f64
    };
    0.7 * match_ratio + 0.3 * average_ocr_confidence
}

/// Holographic-pattern confidence.
pub fn holo_pattern_confidence(variance: f64, expected_holo: bool) -> f64 {
    if !expected_holo {
        return if variance < 0.2 {
            1.0
        } else if variance <= 0.4 {
            0.7
        } else {
            0.3
        };
    }
    if (0.3..=0.9).contains(&variance) {
        (1.0 - (variance - 0.6).abs() / 0.3).max(0.5)
    } else if variance < 0.3 {
        0.3 + (variance / 0.3) * 0.2
    } else {
        (0.5 - (variance - 0.9)).max(0.2)
    }
}

/// Border-consistency confidence.
pub fn border_consistency_confidence(envelope: &FeatureEnvelope) -> f64 {
    let ratios = envelope.border_metrics.side_ratios();
    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    let variance = ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / ratios.len() as f64;
    let variance_confidence = (1.0 - 10.0 * variance).max(0.0);
    let ratio_confidence = (1.0 - (mean - 0.15).abs() / 0.10).max(0.0);
    0.4 * envelope.border_metrics.symmetry_score + 0.3 * variance_confidence + 0.3 * ratio_confidence
}

/// Font-validation confidence.
pub fn font_validation_confidence(envelope: &FeatureEnvelope) -> f64 {
    let kerning = &envelope.font_metrics.kerning_samples;
    let kerning_variance = if kerning.len() > 1 {
        let mean = kerning.iter().sum::<f64>() / kerning.len() as f64;
        kerning.iter().map(|k| (k - mean).powi(2)).sum::<f64>() / kerning.len() as f64
    } else {
        0.0
    };
    0.4 * envelope.font_metrics.alignment
        + 0.3 * (1.0 - kerning_variance / 0.05).max(0.0)
        + 0.3 * (1.0 - envelope.font_metrics.font_size_variance / 50.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::models::feature_envelope::{
        BorderMetrics, FontMetrics, ImageFormat, ImageMeta, ImageQuality,
    };

    fn envelope_with(border: BorderMetrics, font: FontMetrics) -> FeatureEnvelope {
        FeatureEnvelope {
            ocr_blocks: vec![],
            border_metrics: border,
            holographic_variance: 0.1,
            font_metrics: font,
            image_quality: ImageQuality {
                blur_score: 0.1,
                glare_detected: false,
                brightness: 0.5,
            },
            image_meta: ImageMeta {
                width: 600,
                height: 825,
                format: ImageFormat::Jpeg,
            },
        }
    }

    #[test]
    fn visual_hash_confidence_uses_neutral_default_with_no_references() {
        assert_eq!(visual_hash_confidence("0000000000000000", &[], 0.50), 0.50);
    }

    #[test]
    fn visual_hash_confidence_takes_the_best_reference_match() {
        let hashes = vec!["0000000000000000".to_string(), "00000000000000ff".to_string()];
        let confidence = visual_hash_confidence("0000000000000000", &hashes, 0.50);
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn holo_pattern_not_expected_low_variance_is_confident() {
        assert_eq!(holo_pattern_confidence(0.1, false), 1.0);
        assert_eq!(holo_pattern_confidence(0.3, false), 0.7);
        assert_eq!(holo_pattern_confidence(0.5, false), 0.3);
    }

    #[test]
    fn holo_pattern_expected_midrange_variance_is_confident() {
        let confidence = holo_pattern_confidence(0.6, true);
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn text_match_combines_pattern_ratio_and_ocr_confidence() {
        let confidence = text_match_confidence("Charizard HP120 © Nintendo", Some("Charizard"), 0.9);
        assert!(confidence > 0.0 && confidence <= 1.0);
    }

    #[test]
    fn border_consistency_rewards_symmetric_expected_ratio() {
        let border = BorderMetrics {
            top_ratio: 0.15,
            bottom_ratio: 0.15,
            left_ratio: 0.15,
            right_ratio: 0.15,
            symmetry_score: 1.0,
        };
        let font = FontMetrics {
            kerning_samples: vec![],
            alignment: 1.0,
            font_size_variance: 0.0,
        };
        let envelope = envelope_with(border, font);
        let confidence = border_consistency_confidence(&envelope);
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn font_validation_rewards_low_variance_and_high_alignment() {
        let border = BorderMetrics {
            top_ratio: 0.15,
            bottom_ratio: 0.15,
            left_ratio: 0.15,
            right_ratio: 0.15,
            symmetry_score: 1.0,
        };
        let font = FontMetrics {
            kerning_samples: vec![1.0, 1.0, 1.0],
            alignment: 1.0,
            font_size_variance: 0.0,
        };
        let envelope = envelope_with(border, font);
        let confidence = font_validation_confidence(&envelope);
        assert!((confidence - 1.0).abs() < 1e-9);
    }
}
