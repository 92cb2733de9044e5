// internal
use collectiq::config::Config;
use collectiq::domain::card::services::CardAggregationService;
use collectiq::domain::health;
use collectiq::domain::logo;
use collectiq::domain::pipeline::authenticity::AuthenticityScorer;
use collectiq::domain::pipeline::feature_extractor::FeatureExtractor;
use collectiq::domain::pipeline::ocr_reasoner::OcrReasoner;
use collectiq::domain::pipeline::pricing::{CircuitBreaker, RateLimiter, SourceAdapter};
use collectiq::domain::pipeline::{PipelineOrchestrator, ResultAggregator};
use collectiq::inbound::http::{HttpServer, HttpServerConfig};
use collectiq::outbound::event_bus::InProcessEventBus;
use collectiq::outbound::image_store::HttpObjectStore;
use collectiq::outbound::llm::ReqwestLanguageModel;
use collectiq::outbound::pricing_sources::HttpMarketplaceBackend;
use collectiq::outbound::sqlx::Postgres;
use collectiq::outbound::vision::ReqwestVisionClient;
// std
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    logo::print();
    match run().await {
        Ok(_) => (),
        Err(e) => tracing::error!("Main failed: {:?}", e),
    }
}

async fn run() -> anyhow::Result<()> {
    let config: Config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_max_level(config.rust_log)
        .init();

    let db = Postgres::new(&config.database_url).await?;
    let http_client = reqwest::Client::new();

    let image_store = HttpObjectStore::new(http_client.clone(), config.object_store_url.clone());
    let vision_client = ReqwestVisionClient::new(http_client.clone(), config.vision_endpoint.clone());
    let language_model = ReqwestLanguageModel::new(
        http_client.clone(),
        config.llm_endpoint.clone(),
        config.llm_api_key.clone(),
    );

    let feature_extractor = FeatureExtractor::new(
        image_store.clone(),
        vision_client.clone(),
        vision_client.clone(),
        vision_client.clone(),
    );
    let ocr_reasoner = OcrReasoner::new(language_model.clone(), config.ocr_model);
    let authenticity_scorer = AuthenticityScorer::new(
        language_model.clone(),
        image_store.clone(),
        config.authenticity_model,
        config.authenticity_reference_default,
    );

    let pricing_sources = pricing_sources(&config, &http_client);

    let card_service = CardAggregationService::new(db.clone());
    let event_bus = InProcessEventBus::new(256);
    let event_bus_receiver = event_bus.subscribe();
    let result_aggregator = ResultAggregator::new(card_service, event_bus, db.clone());

    let shutdown = CancellationToken::new();

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        feature_extractor,
        ocr_reasoner,
        language_model,
        pricing_sources,
        authenticity_scorer,
        result_aggregator,
        db.clone(),
        image_store,
        config.clone(),
        shutdown.clone(),
    ));

    tokio::spawn(collectiq::inbound::events::run(
        event_bus_receiver,
        orchestrator.clone(),
        config.auto_trigger_revalue,
    ));

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received, cancelling in-flight pipeline runs");
                shutdown.cancel();
            }
        }
    });

    let health_service = health::services::Service::new(db);
    let server_config = HttpServerConfig {
        bind_address: &config.bind_address,
        allowed_origins: config.allowed_origins.clone(),
    };
    let http_server = HttpServer::new(orchestrator, health_service, server_config).await?;
    http_server.run().await
}

/// Builds the configured set of pricing-source adapters, each with its own
/// rate limiter and circuit breaker.
fn pricing_sources(
    config: &Config,
    http_client: &reqwest::Client,
) -> Vec<Box<dyn collectiq::domain::pipeline::pricing::DynSourceAdapter>> {
    const SOURCES: &[(&str, &str)] = &[
        ("pokemontcg", "https://pricing.collectiq.internal/sources/pokemontcg"),
        ("tcgplayer", "https://pricing.collectiq.internal/sources/tcgplayer"),
        ("ebay-sold", "https://pricing.collectiq.internal/sources/ebay-sold"),
    ];

    SOURCES
        .iter()
        .map(|(name, base_url)| {
            let backend = HttpMarketplaceBackend::new(*name, http_client.clone(), base_url.to_string());
            let defaults = config.pricing_source_defaults;
            let adapter = SourceAdapter::new(
                backend,
                RateLimiter::new(defaults.max_requests, defaults.window),
                CircuitBreaker::new(defaults.circuit_breaker_threshold, defaults.circuit_breaker_timeout),
            );
            Box::new(adapter) as Box<dyn collectiq::domain::pipeline::pricing::DynSourceAdapter>
        })
        .collect()
}
