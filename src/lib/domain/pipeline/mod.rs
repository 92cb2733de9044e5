//! The card-analysis pipeline: five stages coordinated by
//! [`orchestrator::PipelineOrchestrator`].
//!
//! Stage 1 [`feature_extractor`] -> Stage 2 [`ocr_reasoner`] -> parallel
//! { Stage 3 [`pricing`], Stage 4 [`authenticity`] } -> Stage 5
//! [`aggregator`].

pub mod aggregator;
pub mod authenticity;
pub mod errors;
pub mod events;
pub mod feature_extractor;
pub mod llm_json;
pub mod models;
pub mod ocr_reasoner;
pub mod orchestrator;
pub mod ports;
pub mod pricing;
pub mod retry;

pub use aggregator::ResultAggregator;
pub use models::{PipelineInput, PipelineMode, PipelineOutcome};
pub use orchestrator::PipelineOrchestrator;
