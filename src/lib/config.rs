use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use tracing::Level;

const DATABASE_URL_KEY: &str = "DATABASE_URL";
const BIND_ADDRESS_KEY: &str = "BIND_ADDRESS";
const RUST_LOG_KEY: &str = "RUST_LOG";
const AUTO_TRIGGER_REVALUE_KEY: &str = "AUTO_TRIGGER_REVALUE";
const PRICING_WINDOW_DAYS_KEY: &str = "PRICING_WINDOW_DAYS";
const AUTHENTICITY_REFERENCE_DEFAULT_KEY: &str = "AUTHENTICITY_REFERENCE_DEFAULT";
const OVERALL_DEADLINE_MS_KEY: &str = "PIPELINE_OVERALL_DEADLINE_MS";
const LLM_ENDPOINT_KEY: &str = "LLM_ENDPOINT";
const LLM_API_KEY_KEY: &str = "LLM_API_KEY";
const VISION_ENDPOINT_KEY: &str = "VISION_ENDPOINT";
const OBJECT_STORE_URL_KEY: &str = "OBJECT_STORE_URL";
const ALLOWED_ORIGINS_KEY: &str = "ALLOWED_ORIGINS";

/// Default neutral visual-hash confidence used when no reference hashes
/// exist for a card name.
///
/// Implementers may temporarily override this with `authenticity_reference_default`
/// while bootstrapping a reference corpus; that override must be a deliberate,
/// short-lived config change, never a silent default (see `DESIGN.md`).
pub const AUTHENTICITY_REFERENCE_DEFAULT: f64 = 0.50;

/// Per-pricing-source rate limit and circuit-breaker defaults.
#[derive(Debug, Clone, Copy)]
pub struct SourceDefaults {
    /// Maximum requests allowed within `window`.
    pub max_requests: u32,
    /// Sliding rate-limit window.
    pub window: Duration,
    /// Consecutive failures before the circuit opens.
    pub circuit_breaker_threshold: u32,
    /// How long the circuit stays open before a half-open probe.
    pub circuit_breaker_timeout: Duration,
}

impl Default for SourceDefaults {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window: Duration::from_secs(60),
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: Duration::from_secs(60),
        }
    }
}

/// Retry/temperature settings shared by the OCR reasoner and authenticity
/// scorer's language-model calls.
#[derive(Debug, Clone, Copy)]
pub struct ModelSettings {
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_retries: u32,
}

/// Process-wide configuration, loaded once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub rust_log: Level,
    pub auto_trigger_revalue: bool,
    pub pricing_window_days: u32,
    pub authenticity_reference_default: f64,
    pub overall_deadline: Duration,
    pub ocr_model: ModelSettings,
    pub authenticity_model: ModelSettings,
    pub pricing_source_defaults: SourceDefaults,
    pub llm_endpoint: String,
    pub llm_api_key: Option<String>,
    pub vision_endpoint: String,
    pub object_store_url: String,
    pub allowed_origins: Vec<axum::http::HeaderValue>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env_var_by_key(DATABASE_URL_KEY)?;
        let bind_address = env_var_by_key(BIND_ADDRESS_KEY)?;
        let rust_log = Level::from_str(&env_var_by_key(RUST_LOG_KEY)?)?;
        let auto_trigger_revalue = optional_env_var(AUTO_TRIGGER_REVALUE_KEY)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);
        let pricing_window_days = optional_env_var(PRICING_WINDOW_DAYS_KEY)
            .map(|v| v.parse())
            .transpose()
            .context("invalid PRICING_WINDOW_DAYS")?
            .unwrap_or(14);
        let authenticity_reference_default = optional_env_var(AUTHENTICITY_REFERENCE_DEFAULT_KEY)
            .map(|v| v.parse())
            .transpose()
            .context("invalid AUTHENTICITY_REFERENCE_DEFAULT")?
            .unwrap_or(AUTHENTICITY_REFERENCE_DEFAULT);
        let overall_deadline = Duration::from_millis(
            optional_env_var(OVERALL_DEADLINE_MS_KEY)
                .map(|v| v.parse())
                .transpose()
                .context("invalid PIPELINE_OVERALL_DEADLINE_MS")?
                .unwrap_or(120_000),
        );
        let llm_endpoint = optional_env_var(LLM_ENDPOINT_KEY)
            .unwrap_or_else(|| "https://api.collectiq.internal/v1/llm".to_string());
        let llm_api_key = optional_env_var(LLM_API_KEY_KEY);
        let vision_endpoint = optional_env_var(VISION_ENDPOINT_KEY)
            .unwrap_or_else(|| "https://vision.collectiq.internal/v1".to_string());
        let object_store_url = optional_env_var(OBJECT_STORE_URL_KEY)
            .unwrap_or_else(|| "https://objects.collectiq.internal".to_string());
        let allowed_origins: Vec<axum::http::HeaderValue> = optional_env_var(ALLOWED_ORIGINS_KEY)
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.parse())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid ALLOWED_ORIGINS")?;

        Ok(Self {
            database_url,
            bind_address,
            rust_log,
            auto_trigger_revalue,
            pricing_window_days,
            authenticity_reference_default,
            overall_deadline,
            ocr_model: ModelSettings {
                temperature: 0.15,
                max_tokens: 1024,
                max_retries: 3,
            },
            authenticity_model: ModelSettings {
                temperature: 0.20,
                max_tokens: 512,
                max_retries: 5,
            },
            pricing_source_defaults: SourceDefaults::default(),
            llm_endpoint,
            llm_api_key,
            vision_endpoint,
            object_store_url,
            allowed_origins,
        })
    }
}

fn env_var_by_key(key: &str) -> anyhow::Result<String> {
    std::env::var(key).context(format!("failed to get variable from env: {}", key))
}

fn optional_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticity_reference_default_is_neutral_not_elevated() {
        assert_eq!(AUTHENTICITY_REFERENCE_DEFAULT, 0.50);
    }
}
