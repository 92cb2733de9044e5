//! Stage 3a: pricing aggregation and valuation summary synthesis.

use futures::future::join_all;
use serde::Deserialize;
use tracing::instrument;

use crate::config::ModelSettings;
use crate::domain::card::models::errors::PricingError;
use crate::domain::card::models::pricing::{PriceQuery, PricingResult, Trend, ValuationSummary};
use crate::domain::card::models::unit::{NonNegativeUsd, UnitInterval};

use super::adapter::DynSourceAdapter;
use super::normalizer::normalize_all;
use super::outliers::remove_outliers;
use super::valuation;
use crate::domain::pipeline::llm_json::parse_llm_json;
use crate::domain::pipeline::ports::LanguageModelPort;

#[derive(Debug, Deserialize)]
struct RawValuationSummary {
    summary: String,
    fair_value: f64,
    trend: Trend,
    recommendation: String,
    confidence: f64,
}

/// Queries all available adapters in parallel and produces a priced,
/// summarized result. One adapter's failure cannot cancel the others —
/// [`super::adapter::SourceAdapter::fetch`] already absorbs failures into an
/// empty result, so this level only has to handle "no adapter available".
#[instrument(skip(sources, language_model), fields(stage = "pricing"))]
pub async fn fetch_all_comps<L: LanguageModelPort>(
    sources: &[Box<dyn DynSourceAdapter>],
    query: &PriceQuery,
    language_model: &L,
    model_settings: ModelSettings,
) -> Result<(PricingResult, ValuationSummary), PricingError> {
    let availability = join_all(sources.iter().map(|s| s.available())).await;
    let available_sources: Vec<&Box<dyn DynSourceAdapter>> = sources
        .iter()
        .zip(availability.iter())
        .filter_map(|(source, available)| available.then_some(source))
        .collect();

    if available_sources.is_empty() {
        return Err(PricingError::SourcesUnavailable);
    }

    let raw_comps = join_all(available_sources.iter().map(|s| s.fetch(query)))
        .await
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    let normalized = normalize_all(raw_comps);
    let filtered = remove_outliers(normalized);
    let pricing_result = valuation::value(&filtered, query.window_days);

    let summary = build_valuation_summary(&pricing_result, query, language_model, model_settings)
        .await;

    Ok((pricing_result, summary))
}

async fn build_valuation_summary<L: LanguageModelPort>(
    pricing: &PricingResult,
    query: &PriceQuery,
    language_model: &L,
    model_settings: ModelSettings,
) -> ValuationSummary {
    let prompt = format!(
        "Summarize this card's market pricing. Card: {}. Range: ${:.2}-${:.2}, median ${:.2}. \
         Comps: {}. Sources: {:?}. Window: {} days. Confidence: {:.2}. Volatility: {:.2}.\n\
         Respond with JSON: {{summary, fair_value, trend: \"rising\"|\"falling\"|\"stable\", \
         recommendation, confidence}}.",
        query.card_name,
        pricing.value_low.get(),
        pricing.value_high.get(),
        pricing.value_median.get(),
        pricing.comps_count,
        pricing.sources,
        pricing.window_days,
        pricing.confidence.get(),
        pricing.volatility,
    );

    let response = language_model.complete(prompt, model_settings).await;
    let parsed = response
        .ok()
        .and_then(|text| parse_llm_json::<RawValuationSummary>(&text).ok());

    match parsed {
        Some(raw) => {
            let fair_value =
                NonNegativeUsd::new(raw.fair_value).unwrap_or(pricing.value_median);
            let confidence = UnitInterval::new(raw.confidence).unwrap_or(pricing.confidence);
            ValuationSummary {
                summary: raw.summary,
                fair_value,
                trend: raw.trend,
                recommendation: raw.recommendation,
                confidence,
            }
        }
        None => ValuationSummary::synthesize_fallback(pricing),
    }
}
