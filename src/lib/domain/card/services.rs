//! Card domain service: merges stage outputs onto a `Card` and persists it
//! via the chosen strategy.

use std::future::Future;

use super::models::{
    AggregationError, AuthenticityResult, Card, CardMetadata, PricingResult, ValuationSummary,
};
use super::ports::{CardRepository, PersistMode};

/// Service port wrapping the merge-then-persist operation the pipeline's
/// aggregator stage drives. Kept separate from `CardRepository` so the
/// merge rules live in one place regardless of which
/// persistence strategy is chosen.
pub trait CardService: Clone + Send + Sync + 'static {
    fn aggregate(
        &self,
        card: Card,
        mode: PersistMode,
        ocr_metadata: Option<CardMetadata>,
        pricing_result: PricingResult,
        valuation_summary: ValuationSummary,
        authenticity_result: AuthenticityResult,
    ) -> impl Future<Output = Result<Card, AggregationError>> + Send;
}

#[derive(Debug, Clone)]
pub struct CardAggregationService<R: CardRepository> {
    repository: R,
}

impl<R: CardRepository> CardAggregationService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

impl<R: CardRepository> CardService for CardAggregationService<R> {
    async fn aggregate(
        &self,
        mut card: Card,
        mode: PersistMode,
        ocr_metadata: Option<CardMetadata>,
        pricing_result: PricingResult,
        valuation_summary: ValuationSummary,
        authenticity_result: AuthenticityResult,
    ) -> Result<Card, AggregationError> {
        card.apply_valuation(
            ocr_metadata,
            &pricing_result,
            &valuation_summary,
            &authenticity_result,
            chrono::Utc::now(),
        );
        card.check_invariants()
            .map_err(|e| AggregationError::Unexpected(anyhow::anyhow!(e.to_string())))?;

        match mode {
            PersistMode::Upsert => self.repository.upsert(&card).await?,
            PersistMode::VerifiedUpdate => {
                let existing = self
                    .repository
                    .find_by_id(card.user_id, card.card_id)
                    .await?;
                if existing.user_id != card.user_id {
                    return Err(AggregationError::Forbidden);
                }
                if existing.deleted_at.is_some() {
                    return Err(AggregationError::NotFound);
                }
                self.repository.verified_update(&card).await?;
            }
        }

        Ok(card)
    }
}
