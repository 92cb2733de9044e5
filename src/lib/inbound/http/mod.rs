// internal
pub mod handlers;
use crate::domain::health::ports::HealthService;
use crate::domain::pipeline::ports::PipelineService;
use crate::inbound::http::handlers::analyze::trigger_analysis;
use crate::inbound::http::handlers::health::{
    are_server_and_database_running, is_server_running, root,
};
// std
use std::sync::Arc;
// external
use anyhow::Context;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net;
use tower_http::cors::CorsLayer;

// ========
//  server
// ========

/// Contains configuration for the creation of an `HttpServer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig<'a> {
    pub bind_address: &'a str,
    pub allowed_origins: Vec<HeaderValue>,
}

/// Shared server state. `PS` runs the analysis pipeline; `HS` answers
/// health checks. Both trigger paths (this HTTP handler and the event
/// subscriber in [`crate::inbound::events`]) hold the same `PS`. `PS` is
/// already a cheaply-cloneable handle (an `Arc<PipelineOrchestrator<..>>>`
/// in production), so unlike `HS` it isn't additionally `Arc`-wrapped here.
#[derive(Clone)]
pub struct AppState<PS, HS>
where
    PS: PipelineService,
    HS: HealthService,
{
    pub pipeline_service: PS,
    pub health_service: Arc<HS>,
}

/// Server with a router and a listener for running our application.
pub struct HttpServer {
    router: axum::Router,
    listener: net::TcpListener,
}

impl HttpServer {
    pub async fn new(
        pipeline_service: impl PipelineService,
        health_service: impl HealthService,
        config: HttpServerConfig<'_>,
    ) -> anyhow::Result<Self> {
        let trace_layer = tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                tracing::info_span!("http_request", method = ?request.method(), uri)
            },
        );

        let state = AppState {
            pipeline_service,
            health_service: Arc::new(health_service),
        };

        let router = axum::Router::new()
            .merge(private_routes())
            .merge(public_routes())
            .layer(trace_layer)
            .layer(
                CorsLayer::new()
                    .allow_origin(config.allowed_origins)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_headers([header::CONTENT_TYPE]),
            )
            .with_state(state);

        let listener = net::TcpListener::bind(&config.bind_address)
            .await
            .with_context(|| format!("failed to listen on {}", config.bind_address))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::debug!("server running on {}", self.listener.local_addr().unwrap());
        axum::serve(self.listener, self.router)
            .await
            .context("received error from running server")?;
        Ok(())
    }
}

// ===========
//  api error
// ===========

#[derive(Debug)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    Unauthorized(String),
    NotFound(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::InternalServerError(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::InternalServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponseBody::new_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )),
            )
                .into_response(),

            ApiError::UnprocessableEntity(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponseBody::new_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    message,
                )),
            )
                .into_response(),

            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponseBody::new_error(
                    StatusCode::UNAUTHORIZED,
                    message,
                )),
            )
                .into_response(),

            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(ApiResponseBody::new_error(StatusCode::NOT_FOUND, message)),
            )
                .into_response(),
        }
    }
}

// =============
//  http things
// =============

#[derive(Debug, Serialize, PartialEq)]
pub struct ApiErrorData {
    pub message: String,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

// ========
//  routes
// ========

pub fn private_routes<PS, HS>() -> Router<AppState<PS, HS>>
where
    PS: PipelineService,
    HS: HealthService,
{
    Router::new().nest(
        "/api/v1",
        Router::new().route("/cards/:card_id/analyze", post(trigger_analysis)),
    )
}

pub fn public_routes<PS, HS>() -> Router<AppState<PS, HS>>
where
    PS: PipelineService,
    HS: HealthService,
{
    Router::new()
        .route("/", get(root))
        .route("/health/server", get(is_server_running))
        .route("/health/database", get(are_server_and_database_running))
}
