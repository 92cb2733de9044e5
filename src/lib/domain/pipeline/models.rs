//! Orchestrator input/output types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::card::models::Card;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineMode {
    NewCard,
    Revalue,
}

/// Everything the orchestrator needs to run one pipeline submission.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub request_id: String,
    pub image_ref: String,
    pub expected_set: Option<String>,
    pub expected_rarity: Option<String>,
    pub mode: PipelineMode,
    pub force_refresh: bool,
}

/// The orchestrator's single terminal status: success or failure, never
/// a partial result.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Completed(Card),
    /// An idempotent resubmission observed an in-flight execution.
    AlreadyInFlight { execution_id: String },
}
