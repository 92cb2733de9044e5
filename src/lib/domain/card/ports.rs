//! Port traits for card persistence.

use std::future::Future;
use uuid::Uuid;

use super::models::{AggregationError, Card};

/// Which persistence strategy the result aggregator should use, chosen by
/// caller intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// New-card completion: a single conditional write to the primary key,
    /// skipping the existence check (`skipCardFetch = true`).
    Upsert,
    /// Re-valuation: read-then-conditionally-update, verifying ownership
    /// and non-deletion (`skipCardFetch = false`).
    VerifiedUpdate,
}

/// Database port for card persistence.
///
/// Mirrors the upsert-vs-verified-update split: the upsert path avoids a
/// read-before-write race against a not-yet-caught-up
/// secondary index, while the verified-update path must first confirm
/// ownership and non-deletion before writing.
pub trait CardRepository: Clone + Send + Sync + 'static {
    /// Writes `card` directly by primary key, with no existence check.
    fn upsert(&self, card: &Card) -> impl Future<Output = Result<(), AggregationError>> + Send;

    /// Writes `card` only if it exists, is owned by `card.user_id`, and is
    /// not soft-deleted. Fails with `NotFound` or `Forbidden` otherwise.
    fn verified_update(
        &self,
        card: &Card,
    ) -> impl Future<Output = Result<(), AggregationError>> + Send;

    /// Fetches a card by its identity, for the verified-update path's
    /// ownership check and for read access outside the pipeline.
    fn find_by_id(
        &self,
        user_id: Uuid,
        card_id: Uuid,
    ) -> impl Future<Output = Result<Card, AggregationError>> + Send;
}
