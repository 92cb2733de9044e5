//! `IdempotencyStore` adapter backed by a conditional `INSERT ... ON
//! CONFLICT DO NOTHING`. The idempotency store is shared across all
//! workers and must use conditional writes, never read-then-write.

use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::pipeline::errors::IdempotencyError;
use crate::domain::pipeline::ports::{IdempotencyDecision, IdempotencyFingerprint, IdempotencyStore};

use super::postgres::Postgres;

#[derive(Debug, FromRow)]
struct IdempotencyRow {
    operation: String,
    user_id: Uuid,
    card_id: Uuid,
    execution_id: String,
    completed: bool,
}

impl IdempotencyStore for Postgres {
    async fn begin(
        &self,
        request_id: &str,
        fingerprint: IdempotencyFingerprint,
    ) -> Result<IdempotencyDecision, IdempotencyError> {
        let execution_id = Uuid::new_v4().to_string();

        let inserted = sqlx::query(
            "INSERT INTO idempotency_keys
                (request_id, operation, user_id, card_id, execution_id, completed)
             VALUES ($1, $2, $3, $4, $5, false)
             ON CONFLICT (request_id) DO NOTHING",
        )
        .bind(request_id)
        .bind(&fingerprint.operation)
        .bind(fingerprint.user_id)
        .bind(fingerprint.card_id)
        .bind(&execution_id)
        .execute(&self.pool)
        .await
        .map_err(|e| IdempotencyError::Unavailable(e.into()))?;

        if inserted.rows_affected() == 1 {
            return Ok(IdempotencyDecision::Start { execution_id });
        }

        let existing: IdempotencyRow = sqlx::query_as(
            "SELECT operation, user_id, card_id, execution_id, completed
             FROM idempotency_keys WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| IdempotencyError::Unavailable(e.into()))?;

        if existing.operation != fingerprint.operation
            || existing.user_id != fingerprint.user_id
            || existing.card_id != fingerprint.card_id
        {
            return Err(IdempotencyError::FingerprintMismatch(request_id.to_string()));
        }

        if existing.completed {
            Ok(IdempotencyDecision::AlreadyCompleted {
                execution_id: existing.execution_id,
            })
        } else {
            Ok(IdempotencyDecision::InFlight {
                execution_id: existing.execution_id,
            })
        }
    }

    async fn complete(&self, request_id: &str, execution_id: &str) -> Result<(), IdempotencyError> {
        sqlx::query(
            "UPDATE idempotency_keys SET completed = true
             WHERE request_id = $1 AND execution_id = $2",
        )
        .bind(request_id)
        .bind(execution_id)
        .execute(&self.pool)
        .await
        .map_err(|e| IdempotencyError::Unavailable(e.into()))?;

        Ok(())
    }
}
