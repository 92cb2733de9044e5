//! Stage 1 output: visual features and OCR text extracted from a card image.

use serde::{Deserialize, Serialize};

/// Bounding box in normalized `[0,1]` image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockType {
    Line,
    Word,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrBlock {
    pub text: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    pub block_type: BlockType,
}

/// The region an [`OcrBlock`] falls into, by vertical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrRegion {
    Top,
    Middle,
    Bottom,
}

impl OcrBlock {
    pub fn region(&self) -> OcrRegion {
        let top = self.bounding_box.top;
        if top < 0.30 {
            OcrRegion::Top
        } else if top < 0.70 {
            OcrRegion::Middle
        } else {
            OcrRegion::Bottom
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderMetrics {
    pub top_ratio: f64,
    pub bottom_ratio: f64,
    pub left_ratio: f64,
    pub right_ratio: f64,
    pub symmetry_score: f64,
}

impl BorderMetrics {
    pub fn side_ratios(&self) -> [f64; 4] {
        [
            self.top_ratio,
            self.bottom_ratio,
            self.left_ratio,
            self.right_ratio,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontMetrics {
    pub kerning_samples: Vec<f64>,
    pub alignment: f64,
    pub font_size_variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageQuality {
    pub blur_score: f64,
    pub glare_detected: bool,
    pub brightness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// In-memory, pipeline-scoped stage 1 output. Never persisted directly;
/// consumed by the OCR reasoner and authenticity scorer within the same run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEnvelope {
    pub ocr_blocks: Vec<OcrBlock>,
    pub border_metrics: BorderMetrics,
    pub holographic_variance: f64,
    pub font_metrics: FontMetrics,
    pub image_quality: ImageQuality,
    pub image_meta: ImageMeta,
}

impl FeatureEnvelope {
    /// Blocks in `region`, in original order.
    pub fn blocks_in(&self, region: OcrRegion) -> impl Iterator<Item = &OcrBlock> {
        self.ocr_blocks
            .iter()
            .filter(move |block| block.region() == region)
    }

    /// Mean OCR confidence across all blocks, 0.0 if there are none.
    pub fn average_ocr_confidence(&self) -> f64 {
        if self.ocr_blocks.is_empty() {
            return 0.0;
        }
        self.ocr_blocks.iter().map(|b| b.confidence).sum::<f64>() / self.ocr_blocks.len() as f64
    }

    /// The highest-confidence OCR block, used by the OCR-reasoner fallback.
    pub fn top_block(&self) -> Option<&OcrBlock> {
        self.ocr_blocks
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}
