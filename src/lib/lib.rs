//! CollectIQ — card identification, pricing, and authenticity pipeline.
//!
//! This crate implements the multi-stage analysis pipeline that turns an
//! uploaded trading-card image into a priced, authenticity-scored `Card`
//! record: feature extraction, OCR reasoning, pricing aggregation,
//! authenticity scoring, and result aggregation, coordinated by a pipeline
//! orchestrator.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
