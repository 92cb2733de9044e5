pub mod adapter;
pub mod aggregator;
pub mod circuit_breaker;
pub mod normalizer;
pub mod outliers;
pub mod rate_limiter;
pub mod stats;
pub mod valuation;

pub use adapter::{DynSourceAdapter, SourceAdapter, SourceAdapterBackend};
pub use aggregator::fetch_all_comps;
pub use circuit_breaker::CircuitBreaker;
pub use rate_limiter::RateLimiter;
