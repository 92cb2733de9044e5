//! Stage 5: result aggregation.

use chrono::Utc;
use tracing::instrument;

use crate::domain::card::models::{
    AuthenticityResult, Card, CardMetadata, PipelineError, PricingResult, ValuationSummary,
};
use crate::domain::card::ports::PersistMode;
use crate::domain::card::services::CardService;

use super::events::{CardValuationCompleted, DomainEvent};
use super::ports::{DeadLetterStore, DeadLetteredAggregation, EventBus};
use super::retry::retry_with_backoff_from;

/// Retries persistence this many times before dead-lettering, with a base
/// delay distinct from (and longer than) the other pipeline stages' 1s: 2s,
/// 4s, 8s.
const AGGREGATION_MAX_ATTEMPTS: u32 = 3;
const AGGREGATION_BASE_DELAY: std::time::Duration = std::time::Duration::from_secs(2);

/// Aggregates stage outputs onto a `Card`, persists it via `service`, and
/// emits `CardValuationCompleted`. Aggregation failures are retried with
/// backoff (2s, 4s, 8s); once retries are exhausted the stage outputs are
/// handed to `dead_letters` for manual inspection rather than dropped.
/// Event emission failure is logged but never fails the aggregation.
pub struct ResultAggregator<S, E, D> {
    service: S,
    event_bus: E,
    dead_letters: D,
}

impl<S: CardService, E: EventBus, D: DeadLetterStore> ResultAggregator<S, E, D> {
    pub fn new(service: S, event_bus: E, dead_letters: D) -> Self {
        Self {
            service,
            event_bus,
            dead_letters,
        }
    }

    #[instrument(skip_all, fields(stage = "aggregation", card_id = %card.card_id))]
    pub async fn aggregate(
        &self,
        card: Card,
        mode: PersistMode,
        request_id: String,
        ocr_metadata: Option<CardMetadata>,
        pricing_result: PricingResult,
        valuation_summary: ValuationSummary,
        authenticity_result: AuthenticityResult,
    ) -> Result<Card, PipelineError> {
        let attempt = retry_with_backoff_from(AGGREGATION_MAX_ATTEMPTS, AGGREGATION_BASE_DELAY, || {
            let card = card.clone();
            let ocr_metadata = ocr_metadata.clone();
            let pricing_result = pricing_result.clone();
            let valuation_summary = valuation_summary.clone();
            let authenticity_result = authenticity_result.clone();
            async move {
                self.service
                    .aggregate(
                        card,
                        mode,
                        ocr_metadata,
                        pricing_result,
                        valuation_summary,
                        authenticity_result,
                    )
                    .await
            }
        })
        .await;

        let persisted = match attempt {
            Ok(persisted) => persisted,
            Err(error) => {
                let entry = DeadLetteredAggregation {
                    user_id: card.user_id,
                    card_id: card.card_id,
                    request_id: request_id.clone(),
                    ocr_metadata: ocr_metadata.clone(),
                    pricing_result: pricing_result.clone(),
                    valuation_summary: valuation_summary.clone(),
                    authenticity_result: authenticity_result.clone(),
                    error: error.to_string(),
                };
                if let Err(store_error) = self.dead_letters.record(entry).await {
                    tracing::error!(
                        error = %store_error,
                        card_id = %card.card_id,
                        "failed to persist dead-lettered aggregation"
                    );
                }
                return Err(PipelineError::DeadLettered(error.into()));
            }
        };

        let event = DomainEvent::CardValuationCompleted(CardValuationCompleted {
            card_id: persisted.card_id,
            user_id: persisted.user_id,
            name: persisted.identification.as_ref().map(|i| i.name.clone()),
            set: persisted
                .identification
                .as_ref()
                .and_then(|i| i.set.clone()),
            value_low: pricing_result.value_low.get(),
            value_median: pricing_result.value_median.get(),
            value_high: pricing_result.value_high.get(),
            authenticity_score: authenticity_result.authenticity_score.get(),
            fake_detected: authenticity_result.fake_detected,
            pricing_confidence: pricing_result.confidence.get(),
            pricing_sources: pricing_result.sources.clone(),
            valuation_trend: valuation_summary.trend,
            valuation_fair_value: valuation_summary.fair_value.get(),
            ocr_metadata: persisted.ocr_metadata.as_ref().map(Into::into),
            request_id,
            timestamp: Utc::now(),
        });

        if let Err(error) = self.event_bus.publish(event).await {
            tracing::error!(error = %error, card_id = %persisted.card_id, "failed to publish CardValuationCompleted");
        }

        Ok(persisted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::domain::card::models::authenticity::AuthenticitySignals;
    use crate::domain::card::models::errors::AggregationError;
    use crate::domain::card::models::unit::{NonNegativeUsd, UnitInterval};
    use crate::domain::card::models::Trend;
    use crate::domain::pipeline::errors::DeadLetterError;
    use crate::outbound::event_bus::InProcessEventBus;

    #[derive(Clone)]
    struct AlwaysFailsService;

    impl CardService for AlwaysFailsService {
        async fn aggregate(
            &self,
            _card: Card,
            _mode: PersistMode,
            _ocr_metadata: Option<CardMetadata>,
            _pricing_result: PricingResult,
            _valuation_summary: ValuationSummary,
            _authenticity_result: AuthenticityResult,
        ) -> Result<Card, AggregationError> {
            Err(AggregationError::StorageConflict("version mismatch".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingDeadLetterStore {
        recorded: Mutex<Vec<DeadLetteredAggregation>>,
    }

    impl Clone for RecordingDeadLetterStore {
        fn clone(&self) -> Self {
            Self {
                recorded: Mutex::new(self.recorded.lock().unwrap().clone()),
            }
        }
    }

    impl DeadLetterStore for RecordingDeadLetterStore {
        async fn record(&self, entry: DeadLetteredAggregation) -> Result<(), DeadLetterError> {
            self.recorded.lock().unwrap().push(entry);
            Ok(())
        }
    }

    fn sample_card() -> Card {
        let now = chrono::Utc::now();
        Card {
            user_id: Uuid::new_v4(),
            card_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            front_image_ref: "images/front.jpg".to_string(),
            back_image_ref: None,
            identification: None,
            pricing: None,
            authenticity: None,
            ocr_metadata: None,
        }
    }

    fn sample_pricing() -> PricingResult {
        PricingResult::empty(14, "no comps")
    }

    fn sample_valuation(pricing: &PricingResult) -> ValuationSummary {
        ValuationSummary {
            summary: "stub".to_string(),
            fair_value: NonNegativeUsd::ZERO,
            trend: Trend::Stable,
            recommendation: "none".to_string(),
            confidence: pricing.confidence,
        }
    }

    fn sample_authenticity() -> AuthenticityResult {
        AuthenticityResult::fallback(AuthenticitySignals {
            visual_hash: UnitInterval::clamp(0.5),
            text_match: UnitInterval::clamp(0.5),
            holo_pattern: UnitInterval::clamp(0.5),
            border_consistency: UnitInterval::clamp(0.5),
            font_validation: UnitInterval::clamp(0.5),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_record_a_dead_letter_and_return_dead_lettered_error() {
        let dead_letters = RecordingDeadLetterStore::default();
        let aggregator = ResultAggregator::new(
            AlwaysFailsService,
            InProcessEventBus::new(1),
            dead_letters.clone(),
        );
        let card = sample_card();
        let pricing = sample_pricing();
        let valuation = sample_valuation(&pricing);

        let result = aggregator
            .aggregate(
                card.clone(),
                PersistMode::Upsert,
                "req-1".to_string(),
                None,
                pricing,
                valuation,
                sample_authenticity(),
            )
            .await;

        assert!(matches!(result, Err(PipelineError::DeadLettered(_))));
        let recorded = dead_letters.recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].card_id, card.card_id);
        assert_eq!(recorded[0].request_id, "req-1");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_wait_the_full_2s_4s_schedule() {
        let start = tokio::time::Instant::now();
        let aggregator = ResultAggregator::new(
            AlwaysFailsService,
            InProcessEventBus::new(1),
            RecordingDeadLetterStore::default(),
        );
        let pricing = sample_pricing();
        let valuation = sample_valuation(&pricing);

        let _ = aggregator
            .aggregate(
                sample_card(),
                PersistMode::Upsert,
                "req-2".to_string(),
                None,
                pricing,
                valuation,
                sample_authenticity(),
            )
            .await;

        // 2s then 4s between the three attempts before giving up: 6s elapsed.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }
}
