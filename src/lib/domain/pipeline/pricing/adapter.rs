//! Pricing-source adapter contract.
//!
//! Capability set composed from shared helpers rather than inherited
//!: each concrete adapter
//! owns a [`RateLimiter`] and [`CircuitBreaker`] instance and calls
//! [`retry_with_backoff`] itself around its network call.

use std::future::Future;
use std::pin::Pin;

use crate::domain::card::models::comps::RawComp;
use crate::domain::card::models::pricing::PriceQuery;

use super::circuit_breaker::CircuitBreaker;
use super::rate_limiter::RateLimiter;
use super::retry::retry_with_backoff;

/// One pricing source's query/fetch capability. Implementations encapsulate
/// source-specific query syntax and authentication; rate limiting, circuit
/// breaking, and retries are provided by [`SourceAdapter::fetch_with_resilience`],
/// composed uniformly over any concrete source.
pub trait SourceAdapterBackend: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn fetch_raw(
        &self,
        query: &PriceQuery,
    ) -> impl Future<Output = anyhow::Result<Vec<RawComp>>> + Send;
}

/// Wraps a [`SourceAdapterBackend`] with the rate limiter / circuit breaker /
/// retry composition every adapter shares.
pub struct SourceAdapter<B> {
    backend: B,
    rate_limiter: RateLimiter,
    circuit_breaker: CircuitBreaker,
}

impl<B: SourceAdapterBackend> SourceAdapter<B> {
    pub fn new(backend: B, rate_limiter: RateLimiter, circuit_breaker: CircuitBreaker) -> Self {
        Self {
            backend,
            rate_limiter,
            circuit_breaker,
        }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub async fn available(&self) -> bool {
        self.circuit_breaker.available().await
    }

    /// Fetches comps for `query`, applying the rate limiter before every
    /// attempt and up to 3 retries with exponential backoff. On exhaustion,
    /// records the failure on the circuit breaker and returns an empty list
    /// rather than propagating an error.
    #[tracing::instrument(skip(self, query), fields(source = self.backend.name()))]
    pub async fn fetch(&self, query: &PriceQuery) -> Vec<RawComp> {
        let result = retry_with_backoff(3, || async {
            self.rate_limiter.acquire().await;
            self.backend.fetch_raw(query).await
        })
        .await;

        match result {
            Ok(comps) => {
                self.circuit_breaker.on_success().await;
                comps
            }
            Err(error) => {
                tracing::warn!(error = %error, "pricing source exhausted retries");
                self.circuit_breaker.on_failure().await;
                Vec::new()
            }
        }
    }
}

/// Object-safe view over [`SourceAdapter`] so the orchestrator can hold a
/// heterogeneous set of sources. Each method
/// boxes its future, the same tradeoff `async_trait` makes, kept manual
/// here since only this one fan-out point needs dynamic dispatch.
pub trait DynSourceAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn available(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
    fn fetch<'a>(
        &'a self,
        query: &'a PriceQuery,
    ) -> Pin<Box<dyn Future<Output = Vec<RawComp>> + Send + 'a>>;
}

impl<B: SourceAdapterBackend> DynSourceAdapter for SourceAdapter<B> {
    fn name(&self) -> &str {
        SourceAdapter::name(self)
    }

    fn available(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(SourceAdapter::available(self))
    }

    fn fetch<'a>(
        &'a self,
        query: &'a PriceQuery,
    ) -> Pin<Box<dyn Future<Output = Vec<RawComp>> + Send + 'a>> {
        Box::pin(SourceAdapter::fetch(self, query))
    }
}
