//! Error taxonomy for the card domain and pipeline stages.

use thiserror::Error;

/// Feature extraction failures.
#[derive(Debug, Error)]
pub enum FeatureExtractionError {
    #[error("image does not appear to be a trading card")]
    InvalidCardImage,
    #[error("image contains content that cannot be uploaded")]
    InappropriateContent,
    #[error("feature extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("image source unavailable: {0}")]
    SourceUnavailable(#[source] anyhow::Error),
}

/// OCR reasoning failures. These never fail the pipeline directly — they're
/// converted to a fallback `CardMetadata` by the orchestrator — but the
/// stage itself must still be able to report why.
#[derive(Debug, Error)]
pub enum OcrReasonerError {
    #[error("language model call failed after retries: {0}")]
    SourceUnavailable(#[source] anyhow::Error),
    #[error("language model response failed schema validation: {0}")]
    SchemaViolation(String),
}

/// Pricing aggregation failures.
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("no pricing source is available")]
    SourcesUnavailable,
}

/// Authenticity scoring failures. As with OCR, the stage has a documented
/// fallback, so failures here are informational rather than pipeline-fatal.
#[derive(Debug, Error)]
pub enum AuthenticityError {
    #[error("language model call failed after retries: {0}")]
    SourceUnavailable(#[source] anyhow::Error),
    #[error("language model response failed schema validation: {0}")]
    SchemaViolation(String),
}

/// Result aggregator / persistence failures.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("card not found")]
    NotFound,
    #[error("card is owned by a different user")]
    Forbidden,
    #[error("conditional write failed: {0}")]
    StorageConflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Unifies per-stage failures into the orchestrator's single terminal
/// status: success or failure, never a partial result.
///
/// Only feature extraction and aggregation failures reach this type in
/// practice — OCR, pricing, and authenticity stage failures are absorbed
/// into per-stage fallbacks before the orchestrator sees them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    FeatureExtraction(#[from] FeatureExtractionError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error("pipeline execution already in flight for this idempotency key")]
    InFlight { execution_id: String },
    #[error("aggregation failed after retries, routed to dead-letter handler")]
    DeadLettered(#[source] anyhow::Error),
}

/// Returns `true` for the Postgres error codes the storage layer treats as
/// constraint violations rather than unexpected failures (unique violation
/// `23505`, check violation `23514`).
pub trait IsConstraintViolation {
    fn is_constraint_violation(&self) -> bool;
}

impl IsConstraintViolation for sqlx::Error {
    fn is_constraint_violation(&self) -> bool {
        match self.as_database_error() {
            Some(db_error) => matches!(db_error.code().as_deref(), Some("23505") | Some("23514")),
            None => false,
        }
    }
}

impl From<sqlx::Error> for AggregationError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => AggregationError::NotFound,
            other if other.is_constraint_violation() => {
                AggregationError::StorageConflict(other.to_string())
            }
            other => AggregationError::Unexpected(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let error: AggregationError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, AggregationError::NotFound));
    }
}
