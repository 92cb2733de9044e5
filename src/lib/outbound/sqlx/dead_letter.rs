//! `DeadLetterStore` adapter. Captured stage outputs are stored as a single
//! JSONB blob alongside the identifiers needed to find and replay a run —
//! there's no query pattern over the blob's innards, only "list/find by
//! card" for manual triage.

use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::pipeline::errors::DeadLetterError;
use crate::domain::pipeline::ports::{DeadLetterStore, DeadLetteredAggregation};

use super::postgres::Postgres;

#[derive(serde::Serialize)]
struct DeadLetterPayload<'a> {
    ocr_metadata: &'a Option<crate::domain::card::models::CardMetadata>,
    pricing_result: &'a crate::domain::card::models::PricingResult,
    valuation_summary: &'a crate::domain::card::models::ValuationSummary,
    authenticity_result: &'a crate::domain::card::models::AuthenticityResult,
    error: &'a str,
}

impl DeadLetterStore for Postgres {
    async fn record(&self, entry: DeadLetteredAggregation) -> Result<(), DeadLetterError> {
        let payload = DeadLetterPayload {
            ocr_metadata: &entry.ocr_metadata,
            pricing_result: &entry.pricing_result,
            valuation_summary: &entry.valuation_summary,
            authenticity_result: &entry.authenticity_result,
            error: &entry.error,
        };

        sqlx::query(
            "INSERT INTO dead_lettered_aggregations
                (id, user_id, card_id, request_id, payload, created_at)
             VALUES ($1, $2, $3, $4, $5, now())",
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.card_id)
        .bind(&entry.request_id)
        .bind(Json(&payload))
        .execute(&self.pool)
        .await
        .map_err(|e| DeadLetterError::Unavailable(e.into()))?;

        Ok(())
    }
}
