//! Port traits for the pipeline's external collaborators.
//!
//! Each is a capability the feature extractor, OCR reasoner, or
//! authenticity scorer depends on, following the same repository/port
//! split used by `CardRepository` and `HealthRepository`.

use std::future::Future;

use crate::config::ModelSettings;
use crate::domain::card::models::feature_envelope::OcrBlock;
use crate::domain::card::models::{
    AuthenticityResult, CardMetadata, PricingResult, ValuationSummary,
};

use super::errors::{
    DeadLetterError, EventBusError, IdempotencyError, ImageStoreError, LabelDetectionError,
    LlmError, ModerationError, OcrEngineError, ReferenceHashError,
};
use super::events::DomainEvent;
use super::models::{PipelineInput, PipelineOutcome};

/// Fetches an uploaded image by its opaque storage reference.
pub trait ImageStorePort: Clone + Send + Sync + 'static {
    fn fetch(&self, image_ref: &str) -> impl Future<Output = Result<Vec<u8>, ImageStoreError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModerationLabel {
    pub label: String,
    pub confidence: f64,
}

/// Content-safety screen.
pub trait ImageModerationPort: Clone + Send + Sync + 'static {
    fn classify(
        &self,
        image_bytes: &[u8],
    ) -> impl Future<Output = Result<Vec<ModerationLabel>, ModerationError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedLabel {
    pub label: String,
    pub confidence: f64,
}

/// Card-type screen.
pub trait CardLabelPort: Clone + Send + Sync + 'static {
    fn detect(
        &self,
        image_bytes: &[u8],
    ) -> impl Future<Output = Result<Vec<DetectedLabel>, LabelDetectionError>> + Send;
}

/// OCR and label detection on the original image.
pub trait OcrEnginePort: Clone + Send + Sync + 'static {
    fn recognize(
        &self,
        image_bytes: &[u8],
    ) -> impl Future<Output = Result<Vec<OcrBlock>, OcrEngineError>> + Send;
}

/// Read-only lookup of stored reference hashes for a card name.
pub trait ReferenceHashStore: Clone + Send + Sync + 'static {
    fn hashes_for(
        &self,
        card_name: &str,
    ) -> impl Future<Output = Result<Vec<String>, ReferenceHashError>> + Send;
}

/// The single language-model seam used by OCR reasoning, pricing valuation
/// summaries, and authenticity judgment.
pub trait LanguageModelPort: Clone + Send + Sync + 'static {
    fn complete(
        &self,
        prompt: String,
        settings: ModelSettings,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// Publishes domain events.
pub trait EventBus: Clone + Send + Sync + 'static {
    fn publish(
        &self,
        event: DomainEvent,
    ) -> impl Future<Output = Result<(), EventBusError>> + Send;
}

/// A submission's idempotency fingerprint, recorded before the orchestrator
/// starts work.
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyFingerprint {
    pub operation: String,
    pub user_id: uuid::Uuid,
    pub card_id: uuid::Uuid,
}

/// Outcome of registering an idempotency key, before the pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum IdempotencyDecision {
    /// No prior record; the caller should proceed and later call `complete`
    /// with this execution id.
    Start { execution_id: String },
    /// A completed execution exists; its execution id is returned so the
    /// caller can fetch/return the prior result.
    AlreadyCompleted { execution_id: String },
    /// An execution is currently in flight.
    InFlight { execution_id: String },
}

/// Shared, conditional-write-backed store gating duplicate pipeline runs.
/// Shared across all workers and must use conditional writes.
pub trait IdempotencyStore: Clone + Send + Sync + 'static {
    fn begin(
        &self,
        request_id: &str,
        fingerprint: IdempotencyFingerprint,
    ) -> impl Future<Output = Result<IdempotencyDecision, IdempotencyError>> + Send;

    fn complete(
        &self,
        request_id: &str,
        execution_id: &str,
    ) -> impl Future<Output = Result<(), IdempotencyError>> + Send;
}

/// Stage outputs captured for a run whose final persistence step failed
/// after exhausting retries, so the run can be inspected and replayed
/// manually instead of simply lost.
#[derive(Debug, Clone)]
pub struct DeadLetteredAggregation {
    pub user_id: uuid::Uuid,
    pub card_id: uuid::Uuid,
    pub request_id: String,
    pub ocr_metadata: Option<CardMetadata>,
    pub pricing_result: PricingResult,
    pub valuation_summary: ValuationSummary,
    pub authenticity_result: AuthenticityResult,
    pub error: String,
}

/// Records a run the result aggregator gave up on after exhausting its
/// retries, capturing everything needed to replay it by hand.
pub trait DeadLetterStore: Clone + Send + Sync + 'static {
    fn record(
        &self,
        entry: DeadLetteredAggregation,
    ) -> impl Future<Output = Result<(), DeadLetterError>> + Send;
}

/// Narrow seam the inbound layer (HTTP handler and event subscriber) calls
/// to run a submission, so neither has to spell out
/// `PipelineOrchestrator`'s nine collaborator type parameters. Mirrors how
/// `CardService` hides `CardAggregationService`'s repository parameter from
/// its callers.
pub trait PipelineService: Clone + Send + Sync + 'static {
    fn submit(
        &self,
        input: PipelineInput,
    ) -> impl Future<Output = anyhow::Result<PipelineOutcome>> + Send;
}
