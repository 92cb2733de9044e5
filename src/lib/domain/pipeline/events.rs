//! Event bus contracts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::card::models::card_metadata::OcrSummary;
use crate::domain::card::models::pricing::Trend;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCreated {
    pub card_id: Uuid,
    pub user_id: Uuid,
    pub front_s3_key: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardValuationCompleted {
    pub card_id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub set: Option<String>,
    pub value_low: f64,
    pub value_median: f64,
    pub value_high: f64,
    pub authenticity_score: f64,
    pub fake_detected: bool,
    pub pricing_confidence: f64,
    pub pricing_sources: Vec<String>,
    pub valuation_trend: Trend,
    pub valuation_fair_value: f64,
    pub ocr_metadata: Option<OcrSummary>,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Tagged union of everything published on the event bus. `source`
/// (`collectiq.cards` for creation, `collectiq.backend` for valuation
/// completion) is attached by the publisher, not carried here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    CardCreated(CardCreated),
    CardValuationCompleted(CardValuationCompleted),
}
