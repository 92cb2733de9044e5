//! `CardRepository` adapter.
//!
//! Structured sub-objects (`identification`, `pricing`, `authenticity`,
//! `ocr_metadata`) are stored as JSONB columns rather than normalized
//! tables — they're written and read as whole units by the result
//! aggregator and never queried field-by-field, so JSONB avoids a dozen
//! nullable columns for no query benefit.

use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::card::models::card::{AuthenticityFields, Identification, PricingFields};
use crate::domain::card::models::{AggregationError, Card, CardMetadata};
use crate::domain::card::ports::CardRepository;

use super::postgres::Postgres;

#[derive(Debug, FromRow)]
struct DatabaseCard {
    user_id: Uuid,
    card_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    front_image_ref: String,
    back_image_ref: Option<String>,
    identification: Option<Json<Identification>>,
    pricing: Option<Json<PricingFields>>,
    authenticity: Option<Json<AuthenticityFields>>,
    ocr_metadata: Option<Json<CardMetadata>>,
}

impl From<DatabaseCard> for Card {
    fn from(row: DatabaseCard) -> Self {
        Self {
            user_id: row.user_id,
            card_id: row.card_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            front_image_ref: row.front_image_ref,
            back_image_ref: row.back_image_ref,
            identification: row.identification.map(|Json(v)| v),
            pricing: row.pricing.map(|Json(v)| v),
            authenticity: row.authenticity.map(|Json(v)| v),
            ocr_metadata: row.ocr_metadata.map(|Json(v)| v),
        }
    }
}

impl CardRepository for Postgres {
    async fn upsert(&self, card: &Card) -> Result<(), AggregationError> {
        sqlx::query(
            "INSERT INTO cards (
                user_id, card_id, created_at, updated_at, deleted_at,
                front_image_ref, back_image_ref,
                identification, pricing, authenticity, ocr_metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id, card_id) DO UPDATE SET
                updated_at = EXCLUDED.updated_at,
                deleted_at = EXCLUDED.deleted_at,
                front_image_ref = EXCLUDED.front_image_ref,
                back_image_ref = EXCLUDED.back_image_ref,
                identification = EXCLUDED.identification,
                pricing = EXCLUDED.pricing,
                authenticity = EXCLUDED.authenticity,
                ocr_metadata = EXCLUDED.ocr_metadata",
        )
        .bind(card.user_id)
        .bind(card.card_id)
        .bind(card.created_at)
        .bind(card.updated_at)
        .bind(card.deleted_at)
        .bind(&card.front_image_ref)
        .bind(&card.back_image_ref)
        .bind(card.identification.as_ref().map(Json))
        .bind(card.pricing.as_ref().map(Json))
        .bind(card.authenticity.as_ref().map(Json))
        .bind(card.ocr_metadata.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn verified_update(&self, card: &Card) -> Result<(), AggregationError> {
        let result = sqlx::query(
            "UPDATE cards SET
                updated_at = $3,
                identification = $4,
                pricing = $5,
                authenticity = $6,
                ocr_metadata = $7
            WHERE user_id = $1 AND card_id = $2 AND deleted_at IS NULL",
        )
        .bind(card.user_id)
        .bind(card.card_id)
        .bind(card.updated_at)
        .bind(card.identification.as_ref().map(Json))
        .bind(card.pricing.as_ref().map(Json))
        .bind(card.authenticity.as_ref().map(Json))
        .bind(card.ocr_metadata.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AggregationError::StorageConflict(
                "card no longer exists, is deleted, or was modified concurrently".to_string(),
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, user_id: Uuid, card_id: Uuid) -> Result<Card, AggregationError> {
        let row: DatabaseCard = sqlx::query_as(
            "SELECT user_id, card_id, created_at, updated_at, deleted_at,
                    front_image_ref, back_image_ref,
                    identification, pricing, authenticity, ocr_metadata
             FROM cards WHERE user_id = $1 AND card_id = $2",
        )
        .bind(user_id)
        .bind(card_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}
