//! Stage 1: feature extraction.

use tracing::instrument;

use crate::domain::card::models::errors::FeatureExtractionError;
use crate::domain::card::models::feature_envelope::{
    BorderMetrics, FeatureEnvelope, FontMetrics, ImageFormat, ImageMeta, ImageQuality, OcrBlock,
};

use super::ports::{CardLabelPort, ImageModerationPort, ImageStorePort, OcrEnginePort};
use super::retry::retry_with_backoff;

/// Moderation labels that are always blocked when confidence exceeds the
/// threshold.
const BLOCKED_MODERATION_LABELS: &[&str] = &[
    "explicit nudity",
    "suggestive",
    "violence",
    "disturbing",
    "rude gestures",
    "drugs",
    "tobacco",
    "alcohol",
    "gambling",
    "hate symbols",
    "exposed nudity",
    "partial nudity",
];

const MODERATION_THRESHOLD: f64 = 0.60;

/// Allowed aspect ratio range for card localization, with 5% padding applied
/// by the caller before this check.
const CARD_ASPECT_RATIO_RANGE: std::ops::RangeInclusive<f64> = 0.5..=1.0;

pub struct FeatureExtractor<I, M, L, O> {
    image_store: I,
    moderation: M,
    label_detector: L,
    ocr_engine: O,
}

impl<I, M, L, O> FeatureExtractor<I, M, L, O>
where
    I: ImageStorePort,
    M: ImageModerationPort,
    L: CardLabelPort,
    O: OcrEnginePort,
{
    pub fn new(image_store: I, moderation: M, label_detector: L, ocr_engine: O) -> Self {
        Self {
            image_store,
            moderation,
            label_detector,
            ocr_engine,
        }
    }

    #[instrument(skip(self), fields(stage = "feature_extraction"))]
    pub async fn extract(&self, image_ref: &str) -> Result<FeatureEnvelope, FeatureExtractionError> {
        let image_bytes = retry_with_backoff(3, || async {
            self.image_store
                .fetch(image_ref)
                .await
                .map_err(|e| FeatureExtractionError::SourceUnavailable(e.into()))
        })
        .await?;

        let moderation_labels = self
            .moderation
            .classify(&image_bytes)
            .await
            .map_err(|e| FeatureExtractionError::SourceUnavailable(e.into()))?;
        if moderation_labels.iter().any(|label| {
            BLOCKED_MODERATION_LABELS
                .iter()
                .any(|blocked| label.label.eq_ignore_ascii_case(blocked))
                && label.confidence > MODERATION_THRESHOLD
        }) {
            return Err(FeatureExtractionError::InappropriateContent);
        }

        let card_labels = self
            .label_detector
            .detect(&image_bytes)
            .await
            .map_err(|e| FeatureExtractionError::SourceUnavailable(e.into()))?;
        if card_labels.is_empty() {
            return Err(FeatureExtractionError::InvalidCardImage);
        }

        let ocr_blocks = self
            .ocr_engine
            .recognize(&image_bytes)
            .await
            .map_err(|e| FeatureExtractionError::SourceUnavailable(e.into()))?;

        let image_meta = decode_image_meta(&image_bytes)?;
        let localized = localize_card(image_meta);

        let border_metrics = compute_border_metrics(&image_bytes, &ocr_blocks, localized);
        let holographic_variance = compute_holographic_variance(&image_bytes);
        let font_metrics = compute_font_metrics(&ocr_blocks);
        let image_quality = compute_image_quality(&image_bytes);

        Ok(FeatureEnvelope {
            ocr_blocks,
            border_metrics,
            holographic_variance,
            font_metrics,
            image_quality,
            image_meta,
        })
    }
}

fn decode_image_meta(image_bytes: &[u8]) -> Result<ImageMeta, FeatureExtractionError> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|e| FeatureExtractionError::ExtractionFailed(e.to_string()))?;
    let format = image::guess_format(image_bytes)
        .ok()
        .and_then(|f| match f {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::WebP => Some(ImageFormat::WebP),
            _ => None,
        })
        .unwrap_or(ImageFormat::Jpeg);
    Ok(ImageMeta {
        width: image.width(),
        height: image.height(),
        format,
    })
}

/// Whether the image's aspect ratio, with 5% padding, falls within the
/// expected card range. Localization failure just means we continue with
/// the full image — this never errors.
fn localize_card(meta: ImageMeta) -> bool {
    let ratio = (meta.width as f64 * 1.05) / (meta.height as f64 * 1.05).max(1.0);
    CARD_ASPECT_RATIO_RANGE.contains(&ratio)
}

/// Sobel gradient threshold a row/column average must exceed to count as the
/// card's physical edge against its background.
const BORDER_EDGE_THRESHOLD: f64 = 40.0;
/// Never scan past this fraction of the image from each side: beyond it the
/// "border" found is almost certainly the card's own artwork, not its edge.
const MAX_BORDER_SCAN_FRACTION: f64 = 0.25;

/// Finds the card's border by gradient: each side is scanned inward from the
/// image edge until the averaged Sobel magnitude of a row/column crosses
/// [`BORDER_EDGE_THRESHOLD`], which marks the transition from background to
/// card. OCR block positions (all of which lie inside the printed border)
/// clamp each ratio so a weak or noisy gradient can't report a border wider
/// than the card's own text. `localized` (the whole-image aspect-ratio
/// check) scales down the symmetry score when it failed, since the
/// gradient scan is less trustworthy against an uncropped background.
fn compute_border_metrics(image_bytes: &[u8], ocr_blocks: &[OcrBlock], localized: bool) -> BorderMetrics {
    let Ok(image) = image::load_from_memory(image_bytes) else {
        return BorderMetrics {
            top_ratio: 0.0,
            bottom_ratio: 0.0,
            left_ratio: 0.0,
            right_ratio: 0.0,
            symmetry_score: 0.0,
        };
    };
    let gray = image.to_luma8();
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    if width < 3 || height < 3 {
        return BorderMetrics {
            top_ratio: 0.0,
            bottom_ratio: 0.0,
            left_ratio: 0.0,
            right_ratio: 0.0,
            symmetry_score: 0.0,
        };
    }

    let magnitude = sobel_gradient_magnitude(&gray, width, height);

    let mut top_ratio = scan_border_edge(&magnitude, width, height, BorderSide::Top);
    let mut bottom_ratio = scan_border_edge(&magnitude, width, height, BorderSide::Bottom);
    let mut left_ratio = scan_border_edge(&magnitude, width, height, BorderSide::Left);
    let mut right_ratio = scan_border_edge(&magnitude, width, height, BorderSide::Right);

    if let Some(top_text) = ocr_blocks.iter().map(|b| b.bounding_box.top).fold(None, min_opt) {
        top_ratio = top_ratio.min(top_text);
    }
    if let Some(bottom_text) = ocr_blocks
        .iter()
        .map(|b| 1.0 - (b.bounding_box.top + b.bounding_box.height))
        .fold(None, min_opt)
    {
        bottom_ratio = bottom_ratio.min(bottom_text.max(0.0));
    }
    if let Some(left_text) = ocr_blocks.iter().map(|b| b.bounding_box.left).fold(None, min_opt) {
        left_ratio = left_ratio.min(left_text);
    }
    if let Some(right_text) = ocr_blocks
        .iter()
        .map(|b| 1.0 - (b.bounding_box.left + b.bounding_box.width))
        .fold(None, min_opt)
    {
        right_ratio = right_ratio.min(right_text.max(0.0));
    }

    let horizontal_symmetry = 1.0 - (top_ratio - bottom_ratio).abs() / MAX_BORDER_SCAN_FRACTION;
    let vertical_symmetry = 1.0 - (left_ratio - right_ratio).abs() / MAX_BORDER_SCAN_FRACTION;
    let mut symmetry_score = ((horizontal_symmetry + vertical_symmetry) / 2.0).clamp(0.0, 1.0);
    if !localized {
        symmetry_score *= 0.75;
    }

    BorderMetrics {
        top_ratio,
        bottom_ratio,
        left_ratio,
        right_ratio,
        symmetry_score,
    }
}

fn min_opt(acc: Option<f64>, value: f64) -> Option<f64> {
    Some(acc.map_or(value, |a: f64| a.min(value)))
}

enum BorderSide {
    Top,
    Bottom,
    Left,
    Right,
}

fn sobel_gradient_magnitude(gray: &image::GrayImage, width: usize, height: usize) -> Vec<f64> {
    const GX: [f64; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
    const GY: [f64; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

    let pixels: Vec<f64> = gray.pixels().map(|p| p.0[0] as f64).collect();
    let mut magnitude = vec![0.0; width * height];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut gx = 0.0;
            let mut gy = 0.0;
            let mut k = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    let p = pixels[(y + dy - 1) * width + (x + dx - 1)];
                    gx += GX[k] * p;
                    gy += GY[k] * p;
                    k += 1;
                }
            }
            magnitude[y * width + x] = (gx * gx + gy * gy).sqrt();
        }
    }
    magnitude
}

/// Inset ratio (of `width`/`height`, as appropriate) at which the averaged
/// gradient magnitude first crosses [`BORDER_EDGE_THRESHOLD`] scanning
/// inward from `side`. Falls back to [`MAX_BORDER_SCAN_FRACTION`] if no
/// edge is found within the scan window.
fn scan_border_edge(magnitude: &[f64], width: usize, height: usize, side: BorderSide) -> f64 {
    match side {
        BorderSide::Top => {
            let max_scan = ((height as f64 * MAX_BORDER_SCAN_FRACTION) as usize).max(1);
            for y in 0..max_scan {
                let avg = (0..width).map(|x| magnitude[y * width + x]).sum::<f64>() / width as f64;
                if avg > BORDER_EDGE_THRESHOLD {
                    return y as f64 / height as f64;
                }
            }
            MAX_BORDER_SCAN_FRACTION
        }
        BorderSide::Bottom => {
            let max_scan = ((height as f64 * MAX_BORDER_SCAN_FRACTION) as usize).max(1);
            for i in 0..max_scan {
                let y = height - 1 - i;
                let avg = (0..width).map(|x| magnitude[y * width + x]).sum::<f64>() / width as f64;
                if avg > BORDER_EDGE_THRESHOLD {
                    return i as f64 / height as f64;
                }
            }
            MAX_BORDER_SCAN_FRACTION
        }
        BorderSide::Left => {
            let max_scan = ((width as f64 * MAX_BORDER_SCAN_FRACTION) as usize).max(1);
            for x in 0..max_scan {
                let avg = (0..height).map(|y| magnitude[y * width + x]).sum::<f64>() / height as f64;
                if avg > BORDER_EDGE_THRESHOLD {
                    return x as f64 / width as f64;
                }
            }
            MAX_BORDER_SCAN_FRACTION
        }
        BorderSide::Right => {
            let max_scan = ((width as f64 * MAX_BORDER_SCAN_FRACTION) as usize).max(1);
            for i in 0..max_scan {
                let x = width - 1 - i;
                let avg = (0..height).map(|y| magnitude[y * width + x]).sum::<f64>() / height as f64;
                if avg > BORDER_EDGE_THRESHOLD {
                    return i as f64 / width as f64;
                }
            }
            MAX_BORDER_SCAN_FRACTION
        }
    }
}

/// Mean spatial variation of pixel intensity across the image, normalized
/// to `[0,1]`.
fn compute_holographic_variance(image_bytes: &[u8]) -> f64 {
    let Ok(image) = image::load_from_memory(image_bytes) else {
        return 0.0;
    };
    let gray = image.to_luma8();
    let pixels: Vec<f64> = gray.pixels().map(|p| p.0[0] as f64).collect();
    if pixels.is_empty() {
        return 0.0;
    }
    let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
    let variance = pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / pixels.len() as f64;
    (variance.sqrt() / 128.0).clamp(0.0, 1.0)
}

fn compute_font_metrics(ocr_blocks: &[OcrBlock]) -> FontMetrics {
    let kerning_samples: Vec<f64> = ocr_blocks
        .iter()
        .map(|b| b.bounding_box.width / b.text.len().max(1) as f64)
        .collect();
    let heights: Vec<f64> = ocr_blocks.iter().map(|b| b.bounding_box.height).collect();
    let font_size_variance = if heights.len() > 1 {
        let mean = heights.iter().sum::<f64>() / heights.len() as f64;
        heights.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / heights.len() as f64 * 10_000.0
    } else {
        0.0
    };
    let alignment = if ocr_blocks.len() > 1 {
        let lefts: Vec<f64> = ocr_blocks.iter().map(|b| b.bounding_box.left).collect();
        let mean = lefts.iter().sum::<f64>() / lefts.len() as f64;
        let variance = lefts.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lefts.len() as f64;
        (1.0 - variance * 10.0).clamp(0.0, 1.0)
    } else {
        1.0
    };
    FontMetrics {
        kerning_samples,
        alignment,
        font_size_variance,
    }
}

fn compute_image_quality(image_bytes: &[u8]) -> ImageQuality {
    let Ok(image) = image::load_from_memory(image_bytes) else {
        return ImageQuality {
            blur_score: 0.0,
            glare_detected: false,
            brightness: 0.0,
        };
    };
    let gray = image.to_luma8();
    let pixels: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
    if pixels.is_empty() {
        return ImageQuality {
            blur_score: 0.0,
            glare_detected: false,
            brightness: 0.0,
        };
    }
    let brightness = pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len() as f64 / 255.0;
    let overexposed = pixels.iter().filter(|&&p| p > 240).count();
    let glare_detected = (overexposed as f64 / pixels.len() as f64) > 0.05;

    let width = gray.width() as usize;
    let mut edge_energy = 0.0;
    let mut edge_samples = 0usize;
    for y in 0..gray.height() as usize {
        for x in 1..width {
            let left = pixels[y * width + x - 1] as f64;
            let right = pixels[y * width + x] as f64;
            edge_energy += (right - left).abs();
            edge_samples += 1;
        }
    }
    let blur_score = if edge_samples > 0 {
        (edge_energy / edge_samples as f64 / 64.0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    ImageQuality {
        blur_score,
        glare_detected,
        brightness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline::errors::{ImageStoreError, LabelDetectionError, ModerationError, OcrEngineError};
    use crate::domain::pipeline::ports::{DetectedLabel, ModerationLabel};

    #[derive(Debug, Clone)]
    struct FixedImageStore;

    impl ImageStorePort for FixedImageStore {
        async fn fetch(&self, _image_ref: &str) -> Result<Vec<u8>, ImageStoreError> {
            Ok(vec![0u8; 16])
        }
    }

    #[derive(Debug, Clone)]
    struct ScriptedModeration(Vec<ModerationLabel>);

    impl ImageModerationPort for ScriptedModeration {
        async fn classify(&self, _image_bytes: &[u8]) -> Result<Vec<ModerationLabel>, ModerationError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug, Clone)]
    struct ScriptedLabels(Vec<DetectedLabel>);

    impl CardLabelPort for ScriptedLabels {
        async fn detect(&self, _image_bytes: &[u8]) -> Result<Vec<DetectedLabel>, LabelDetectionError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug, Clone)]
    struct UnreachableOcr;

    impl OcrEnginePort for UnreachableOcr {
        async fn recognize(&self, _image_bytes: &[u8]) -> Result<Vec<OcrBlock>, OcrEngineError> {
            panic!("OCR should never run once moderation or labeling has failed");
        }
    }

    #[tokio::test]
    async fn blocked_moderation_label_above_threshold_fails_as_inappropriate_content() {
        let extractor = FeatureExtractor::new(
            FixedImageStore,
            ScriptedModeration(vec![ModerationLabel {
                label: "Explicit Nudity".to_string(),
                confidence: 0.95,
            }]),
            ScriptedLabels(vec![DetectedLabel {
                label: "trading card".to_string(),
                confidence: 0.9,
            }]),
            UnreachableOcr,
        );

        let result = extractor.extract("images/front.jpg").await;
        assert!(matches!(result, Err(FeatureExtractionError::InappropriateContent)));
    }

    #[tokio::test]
    async fn moderation_label_below_threshold_does_not_block() {
        let extractor = FeatureExtractor::new(
            FixedImageStore,
            ScriptedModeration(vec![ModerationLabel {
                label: "violence".to_string(),
                confidence: 0.10,
            }]),
            ScriptedLabels(vec![]),
            UnreachableOcr,
        );

        // moderation passes, but no card label was detected, so this still
        // fails -- just with a different error than inappropriate content.
        let result = extractor.extract("images/front.jpg").await;
        assert!(matches!(result, Err(FeatureExtractionError::InvalidCardImage)));
    }

    #[test]
    fn localize_card_accepts_expected_card_aspect_ratio() {
        let meta = ImageMeta {
            width: 600,
            height: 825,
            format: ImageFormat::Jpeg,
        };
        assert!(localize_card(meta));
    }

    #[test]
    fn localize_card_rejects_wide_landscape_image() {
        let meta = ImageMeta {
            width: 1600,
            height: 400,
            format: ImageFormat::Jpeg,
        };
        assert!(!localize_card(meta));
    }

    /// Black background with a white inset rectangle starting 20% in from
    /// every side, so the expected gradient border sits at ratio ~0.20.
    fn bordered_card_png() -> Vec<u8> {
        let (width, height) = (100u32, 100u32);
        let image = image::GrayImage::from_fn(width, height, |x, y| {
            let inset = (width as f64 * 0.20) as u32;
            if x >= inset && x < width - inset && y >= inset && y < height - inset {
                image::Luma([235u8])
            } else {
                image::Luma([10u8])
            }
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode sample png");
        bytes
    }

    #[test]
    fn compute_border_metrics_finds_gradient_edge_of_inset_card() {
        let bytes = bordered_card_png();
        let metrics = compute_border_metrics(&bytes, &[], true);

        assert!((metrics.top_ratio - 0.20).abs() < 0.05);
        assert!((metrics.bottom_ratio - 0.20).abs() < 0.05);
        assert!((metrics.left_ratio - 0.20).abs() < 0.05);
        assert!((metrics.right_ratio - 0.20).abs() < 0.05);
        assert!(metrics.symmetry_score > 0.8);
    }

    #[test]
    fn compute_border_metrics_clamps_to_ocr_block_extents() {
        let bytes = bordered_card_png();
        // Text starting at 5% from the top, well inside the detected
        // gradient border -- the ratio must be clamped down to match it.
        let block = OcrBlock {
            text: "Name".to_string(),
            confidence: 0.9,
            bounding_box: BoundingBox {
                top: 0.05,
                left: 0.5,
                width: 0.1,
                height: 0.05,
            },
            block_type: BlockType::Line,
        };
        let metrics = compute_border_metrics(&bytes, &[block], true);
        assert!(metrics.top_ratio <= 0.05 + 1e-9);
    }

    #[test]
    fn compute_border_metrics_penalizes_symmetry_when_not_localized() {
        let bytes = bordered_card_png();
        let localized = compute_border_metrics(&bytes, &[], true);
        let not_localized = compute_border_metrics(&bytes, &[], false);
        assert!(not_localized.symmetry_score < localized.symmetry_score);
    }
}
