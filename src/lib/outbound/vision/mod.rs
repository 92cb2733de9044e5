//! Vision-API adapters: content moderation, card-type labeling, and OCR.
//!
//! All three share one HTTP client and multipart-upload shape, so they
//! live in one adapter bundling related endpoints behind one struct.

use anyhow::Context;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::domain::card::models::feature_envelope::{BlockType, BoundingBox, OcrBlock};
use crate::domain::pipeline::errors::{LabelDetectionError, ModerationError, OcrEngineError};
use crate::domain::pipeline::ports::{CardLabelPort, DetectedLabel, ImageModerationPort, ModerationLabel, OcrEnginePort};

#[derive(Debug, Deserialize)]
struct LabelResponse {
    label: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ModerationResponseEnvelope {
    labels: Vec<LabelResponse>,
}

#[derive(Debug, Deserialize)]
struct DetectionResponseEnvelope {
    labels: Vec<LabelResponse>,
}

#[derive(Debug, Deserialize)]
struct OcrBlockResponse {
    text: String,
    confidence: f64,
    top: f64,
    left: f64,
    width: f64,
    height: f64,
    block_type: String,
}

#[derive(Debug, Deserialize)]
struct OcrResponseEnvelope {
    blocks: Vec<OcrBlockResponse>,
}

fn image_part(image_bytes: &[u8]) -> Form {
    Form::new().part(
        "image",
        Part::bytes(image_bytes.to_vec()).file_name("card.jpg"),
    )
}

/// Calls a vision-API provider's moderation, label-detection, and OCR
/// endpoints over HTTP.
#[derive(Debug, Clone)]
pub struct ReqwestVisionClient {
    client: Client,
    base_url: String,
}

impl ReqwestVisionClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl ImageModerationPort for ReqwestVisionClient {
    async fn classify(&self, image_bytes: &[u8]) -> Result<Vec<ModerationLabel>, ModerationError> {
        let response = self
            .client
            .post(self.endpoint("moderation"))
            .multipart(image_part(image_bytes))
            .send()
            .await
            .context("moderation request failed")
            .map_err(ModerationError::Unavailable)?
            .error_for_status()
            .context("moderation endpoint returned an error status")
            .map_err(ModerationError::Unavailable)?;

        let envelope: ModerationResponseEnvelope = response
            .json()
            .await
            .context("moderation response was not valid JSON")
            .map_err(ModerationError::Unavailable)?;

        Ok(envelope
            .labels
            .into_iter()
            .map(|l| ModerationLabel {
                label: l.label,
                confidence: l.confidence,
            })
            .collect())
    }
}

impl CardLabelPort for ReqwestVisionClient {
    async fn detect(&self, image_bytes: &[u8]) -> Result<Vec<DetectedLabel>, LabelDetectionError> {
        let response = self
            .client
            .post(self.endpoint("labels"))
            .multipart(image_part(image_bytes))
            .send()
            .await
            .context("label detection request failed")
            .map_err(LabelDetectionError::Unavailable)?
            .error_for_status()
            .context("label detection endpoint returned an error status")
            .map_err(LabelDetectionError::Unavailable)?;

        let envelope: DetectionResponseEnvelope = response
            .json()
            .await
            .context("label detection response was not valid JSON")
            .map_err(LabelDetectionError::Unavailable)?;

        Ok(envelope
            .labels
            .into_iter()
            .map(|l| DetectedLabel {
                label: l.label,
                confidence: l.confidence,
            })
            .collect())
    }
}

impl OcrEnginePort for ReqwestVisionClient {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<OcrBlock>, OcrEngineError> {
        let response = self
            .client
            .post(self.endpoint("ocr"))
            .multipart(image_part(image_bytes))
            .send()
            .await
            .context("OCR request failed")
            .map_err(OcrEngineError::Unavailable)?
            .error_for_status()
            .context("OCR endpoint returned an error status")
            .map_err(OcrEngineError::Unavailable)?;

        let envelope: OcrResponseEnvelope = response
            .json()
            .await
            .context("OCR response was not valid JSON")
            .map_err(OcrEngineError::Unavailable)?;

        Ok(envelope
            .blocks
            .into_iter()
            .map(|b| OcrBlock {
                text: b.text,
                confidence: b.confidence,
                bounding_box: BoundingBox {
                    top: b.top,
                    left: b.left,
                    width: b.width,
                    height: b.height,
                },
                block_type: if b.block_type == "word" {
                    BlockType::Word
                } else {
                    BlockType::Line
                },
            })
            .collect())
    }
}
