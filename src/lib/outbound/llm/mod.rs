//! `LanguageModelPort` adapter.
//!
//! One reqwest-backed client serves OCR reasoning, pricing valuation
//! summaries, and authenticity judgment; each call site owns its own retry
//! policy (`domain::pipeline::retry`), so this adapter makes exactly one
//! HTTP attempt per `complete` call.

use anyhow::Context;
use reqwest::{header::AUTHORIZATION, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ModelSettings;
use crate::domain::pipeline::errors::LlmError;
use crate::domain::pipeline::ports::LanguageModelPort;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    completion: String,
}

/// Calls a single text-completion endpoint over HTTP. Grounded on the
/// teacher's external-API client shape: one `reqwest::Client`, a fixed base
/// URL and auth header, one request/response pair per call.
#[derive(Debug, Clone)]
pub struct ReqwestLanguageModel {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ReqwestLanguageModel {
    pub fn new(client: Client, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

impl LanguageModelPort for ReqwestLanguageModel {
    async fn complete(&self, prompt: String, settings: ModelSettings) -> Result<String, LlmError> {
        let mut request = self.client.post(&self.endpoint).json(&CompletionRequest {
            prompt: &prompt,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        });

        if let Some(api_key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {api_key}"));
        }

        let response = request
            .send()
            .await
            .context("language model request failed")
            .map_err(LlmError::SourceUnavailable)?;

        if !response.status().is_success() {
            return Err(LlmError::SourceUnavailable(anyhow::anyhow!(
                "language model returned status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .context("language model response was not valid JSON")
            .map_err(LlmError::SourceUnavailable)?;

        let parsed: CompletionResponse = serde_json::from_value(body)
            .map_err(|e| LlmError::SchemaViolation(e.to_string()))?;

        Ok(parsed.completion)
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::Arc;
    use tokio::sync::Mutex;

    use super::*;

    /// Scriptable `LanguageModelPort` for orchestrator and stage tests:
    /// each call pops the next queued response, in order.
    #[derive(Debug, Clone)]
    pub struct FakeLanguageModel {
        responses: Arc<Mutex<std::collections::VecDeque<Result<String, LlmError>>>>,
    }

    impl FakeLanguageModel {
        pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            }
        }
    }

    impl LanguageModelPort for FakeLanguageModel {
        async fn complete(&self, _prompt: String, _settings: ModelSettings) -> Result<String, LlmError> {
            let mut responses = self.responses.lock().await;
            responses
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::SourceUnavailable(anyhow::anyhow!("fake exhausted"))))
        }
    }
}
