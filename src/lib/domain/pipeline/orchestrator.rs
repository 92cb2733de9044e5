//! Pipeline orchestrator.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::config::Config;
use crate::domain::card::models::authenticity::{AuthenticityResult, AuthenticitySignals};
use crate::domain::card::models::unit::UnitInterval;
use crate::domain::card::models::{Card, PriceQuery, PricingResult, ValuationSummary};
use crate::domain::card::ports::PersistMode;
use crate::domain::card::services::CardService;

use super::aggregator::ResultAggregator;
use super::authenticity::AuthenticityScorer;
use super::feature_extractor::FeatureExtractor;
use super::models::{PipelineInput, PipelineMode, PipelineOutcome};
use super::ocr_reasoner::OcrReasoner;
use super::ports::{
    CardLabelPort, DeadLetterStore, EventBus, IdempotencyDecision, IdempotencyFingerprint,
    IdempotencyStore, ImageModerationPort, ImageStorePort, LanguageModelPort, OcrEnginePort,
    PipelineService, ReferenceHashStore,
};
use super::pricing::{fetch_all_comps, DynSourceAdapter};

/// Coordinates the five pipeline stages in a fixed order: Feature
/// Extractor -> OCR Reasoner -> parallel { Pricing Aggregator,
/// Authenticity Scorer } -> Result Aggregator.
pub struct PipelineOrchestrator<I, M, L, O, LM, R, S, E, D, IS> {
    feature_extractor: FeatureExtractor<I, M, L, O>,
    ocr_reasoner: OcrReasoner<LM>,
    language_model: LM,
    pricing_sources: Vec<Box<dyn DynSourceAdapter>>,
    authenticity_scorer: AuthenticityScorer<LM, R>,
    result_aggregator: ResultAggregator<S, E, D>,
    idempotency: IS,
    image_store: I,
    config: Config,
    /// Cancelled on process shutdown; an in-flight `run_stages` call is
    /// dropped mid-stage rather than left to finish against a draining pool.
    shutdown: CancellationToken,
}

impl<I, M, L, O, LM, R, S, E, D, IS> PipelineOrchestrator<I, M, L, O, LM, R, S, E, D, IS>
where
    I: ImageStorePort,
    M: ImageModerationPort,
    L: CardLabelPort,
    O: OcrEnginePort,
    LM: LanguageModelPort,
    R: ReferenceHashStore,
    S: CardService,
    E: EventBus,
    D: DeadLetterStore,
    IS: IdempotencyStore,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feature_extractor: FeatureExtractor<I, M, L, O>,
        ocr_reasoner: OcrReasoner<LM>,
        language_model: LM,
        pricing_sources: Vec<Box<dyn DynSourceAdapter>>,
        authenticity_scorer: AuthenticityScorer<LM, R>,
        result_aggregator: ResultAggregator<S, E, D>,
        idempotency: IS,
        image_store: I,
        config: Config,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            feature_extractor,
            ocr_reasoner,
            language_model,
            pricing_sources,
            authenticity_scorer,
            result_aggregator,
            idempotency,
            image_store,
            config,
            shutdown,
        }
    }

    /// Runs one pipeline submission end to end. Both the auto-trigger event
    /// subscriber and the direct-invocation HTTP handler call this single
    /// function, so both paths pass through the idempotency gate below.
    #[instrument(skip(self, input), fields(request_id = %input.request_id, card_id = %input.card_id))]
    pub async fn run(&self, input: PipelineInput) -> anyhow::Result<PipelineOutcome> {
        let fingerprint = IdempotencyFingerprint {
            operation: match input.mode {
                PipelineMode::NewCard => "new-card".to_string(),
                PipelineMode::Revalue => "revalue".to_string(),
            },
            user_id: input.user_id,
            card_id: input.card_id,
        };

        let execution_id = match self.idempotency.begin(&input.request_id, fingerprint).await? {
            IdempotencyDecision::AlreadyCompleted { execution_id }
            | IdempotencyDecision::InFlight { execution_id } => {
                return Ok(PipelineOutcome::AlreadyInFlight { execution_id });
            }
            IdempotencyDecision::Start { execution_id } => execution_id,
        };

        let outcome = tokio::select! {
            result = tokio::time::timeout(self.config.overall_deadline, self.run_stages(&input)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(anyhow::anyhow!(
                        "pipeline exceeded overall deadline of {:?}",
                        self.config.overall_deadline
                    )),
                }
            }
            _ = self.shutdown.cancelled() => {
                Err(anyhow::anyhow!("pipeline run cancelled during shutdown"))
            }
        };

        self.idempotency
            .complete(&input.request_id, &execution_id)
            .await?;

        outcome.map(PipelineOutcome::Completed)
    }

    /// Stage 1 -> stage 2 -> parallel { stage 3, stage 4 } -> stage 5. A
    /// feature-extraction failure fails the whole run; OCR,
    /// pricing, and authenticity failures each degrade to their own
    /// fallback and the run continues.
    async fn run_stages(&self, input: &PipelineInput) -> anyhow::Result<Card> {
        let envelope = tokio::time::timeout(
            Duration::from_secs(30),
            self.feature_extractor.extract(&input.image_ref),
        )
        .await
        .map_err(|_| anyhow::anyhow!("feature extraction timed out"))??;

        let ocr_metadata = match tokio::time::timeout(
            Duration::from_secs(30),
            self.ocr_reasoner.interpret(&envelope),
        )
        .await
        {
            Ok(metadata) => metadata,
            Err(_) => crate::domain::card::models::CardMetadata::fallback(
                envelope.top_block().map(|b| b.text.as_str()),
                envelope.top_block().map_or(0.0, |b| b.confidence),
            ),
        };

        let query = PriceQuery {
            card_name: ocr_metadata
                .name
                .resolved_value()
                .unwrap_or_else(|| "Unknown".to_string()),
            set: input
                .expected_set
                .clone()
                .or_else(|| ocr_metadata.set.resolved_value()),
            number: ocr_metadata.collector_number.resolved_value(),
            condition: ocr_metadata.condition_estimate.resolved_value(),
            rarity: input
                .expected_rarity
                .clone()
                .or_else(|| ocr_metadata.rarity.resolved_value()),
            window_days: self.config.pricing_window_days,
        };

        let image_bytes = self
            .image_store
            .fetch(&input.image_ref)
            .await
            .unwrap_or_default();

        // Parallel fan-out: stage 3 and 4 both start after stage 2 and both
        // must complete before stage 5; one branch's error becomes a
        // fallback, never a cancellation of the other.
        let (pricing_outcome, authenticity_outcome) = tokio::join!(
            tokio::time::timeout(
                Duration::from_secs(30),
                fetch_all_comps(
                    &self.pricing_sources,
                    &query,
                    &self.language_model,
                    self.config.ocr_model,
                ),
            ),
            tokio::time::timeout(
                Duration::from_secs(30),
                self.authenticity_scorer
                    .score(&envelope, &ocr_metadata, &image_bytes),
            ),
        );

        let (pricing_result, valuation_summary) = self.pricing_or_fallback(pricing_outcome, &query);
        let authenticity_result = self.authenticity_or_fallback(authenticity_outcome);

        let mode = match input.mode {
            PipelineMode::NewCard => PersistMode::Upsert,
            PipelineMode::Revalue => PersistMode::VerifiedUpdate,
        };

        let now = chrono::Utc::now();
        let card = Card {
            user_id: input.user_id,
            card_id: input.card_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            front_image_ref: input.image_ref.clone(),
            back_image_ref: None,
            identification: None,
            pricing: None,
            authenticity: None,
            ocr_metadata: None,
        };

        self.result_aggregator
            .aggregate(
                card,
                mode,
                input.request_id.clone(),
                Some(ocr_metadata),
                pricing_result,
                valuation_summary,
                authenticity_result,
            )
            .await
            .map_err(anyhow::Error::from)
    }

    fn pricing_or_fallback(
        &self,
        outcome: Result<
            Result<(PricingResult, ValuationSummary), crate::domain::card::models::errors::PricingError>,
            tokio::time::error::Elapsed,
        >,
        query: &PriceQuery,
    ) -> (PricingResult, ValuationSummary) {
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, card_name = %query.card_name, "pricing stage failed, using empty result");
                self.empty_pricing()
            }
            Err(_) => {
                tracing::warn!(card_name = %query.card_name, "pricing stage timed out, using empty result");
                self.empty_pricing()
            }
        }
    }

    fn empty_pricing(&self) -> (PricingResult, ValuationSummary) {
        let pricing = PricingResult::empty(
            self.config.pricing_window_days,
            "No pricing data available from any source",
        );
        let summary = ValuationSummary::synthesize_fallback(&pricing);
        (pricing, summary)
    }

    fn authenticity_or_fallback(
        &self,
        outcome: Result<AuthenticityResult, tokio::time::error::Elapsed>,
    ) -> AuthenticityResult {
        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("authenticity stage timed out, using neutral fallback signals");
                AuthenticityResult::fallback(AuthenticitySignals {
                    visual_hash: UnitInterval::clamp(self.config.authenticity_reference_default),
                    text_match: UnitInterval::clamp(0.0),
                    holo_pattern: UnitInterval::clamp(0.0),
                    border_consistency: UnitInterval::clamp(0.0),
                    font_validation: UnitInterval::clamp(0.0),
                })
            }
        }
    }
}

/// Implemented on `Arc<PipelineOrchestrator<..>>` rather than the bare
/// orchestrator: most collaborators (pooled clients, `Box<dyn
/// DynSourceAdapter>`) aren't themselves cheaply `Clone`, but the `Arc` is,
/// which is all `AppState` needs.
impl<I, M, L, O, LM, R, S, E, D, IS> PipelineService
    for Arc<PipelineOrchestrator<I, M, L, O, LM, R, S, E, D, IS>>
where
    I: ImageStorePort,
    M: ImageModerationPort,
    L: CardLabelPort,
    O: OcrEnginePort,
    LM: LanguageModelPort,
    R: ReferenceHashStore,
    S: CardService,
    E: EventBus,
    D: DeadLetterStore,
    IS: IdempotencyStore,
{
    async fn submit(&self, input: PipelineInput) -> anyhow::Result<PipelineOutcome> {
        self.as_ref().run(input).await
    }
}
