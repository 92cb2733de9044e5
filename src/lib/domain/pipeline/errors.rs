//! Errors for the pipeline's external-collaborator ports.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("image not found for reference {0}")]
    NotFound(String),
    #[error("image store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("moderation classifier unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum LabelDetectionError {
    #[error("label detector unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum OcrEngineError {
    #[error("OCR engine unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ReferenceHashError {
    #[error("reference hash store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model call timed out or was throttled: {0}")]
    SourceUnavailable(#[source] anyhow::Error),
    #[error("language model returned unparseable or schema-invalid output: {0}")]
    SchemaViolation(String),
}

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("event bus publish failed: {0}")]
    PublishFailed(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum IdempotencyError {
    #[error("idempotency store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
    #[error("idempotency key {0} was reused with a different fingerprint")]
    FingerprintMismatch(String),
}

#[derive(Debug, Error)]
pub enum DeadLetterError {
    #[error("dead-letter store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}
