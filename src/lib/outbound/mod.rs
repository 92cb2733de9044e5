//! Adapters implementing the domain's outbound ports against real
//! infrastructure: Postgres, HTTP vision/LLM/pricing providers, an
//! S3-compatible object store, and an in-process event bus.

pub mod event_bus;
pub mod image_store;
pub mod llm;
pub mod pricing_sources;
pub mod sqlx;
pub mod vision;

pub use sqlx::Postgres;
