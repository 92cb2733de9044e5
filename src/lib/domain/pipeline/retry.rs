//! Shared exponential-backoff retry helpers.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Fixed exponential backoff (1s, 2s, 4s) for up to `max_attempts` attempts
/// total, used by the feature extractor, pricing source adapters, and the
/// OCR reasoner's model call.
pub async fn retry_with_backoff<F, Fut, T, E>(max_attempts: u32, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_backoff_from(max_attempts, Duration::from_secs(1), op).await
}

/// Exponential backoff starting at `base_delay` (doubling each attempt) for
/// up to `max_attempts` attempts total. The result aggregator uses a longer
/// `base_delay` (2s, giving 2s/4s/8s) than the other call sites' default 1s.
pub async fn retry_with_backoff_from<F, Fut, T, E>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(error);
                }
                tokio::time::sleep(base_delay * (1u32 << (attempt - 1))).await;
            }
        }
    }
}

/// What a call site's error classifier decides for one failed attempt.
pub enum Classification {
    /// Retry, using the rate-limited delay if `rate_limited` is set.
    Retry { rate_limited: bool },
    /// Not retryable (e.g. a schema violation) — fail immediately.
    GiveUp,
}

/// A backoff policy with a distinct, more aggressive delay for rate-limit
/// errors, jitter, and a per-wait cap — the authenticity scorer's final
/// judgment call uses this: rate-limit errors use a more aggressive base
/// delay (4s vs 2s), with jitter up to 50% and a per-wait cap of 30s.
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub rate_limited_base_delay: Duration,
    pub jitter_fraction: f64,
    pub max_wait: Duration,
}

impl RetryPolicy {
    pub async fn run<F, Fut, T, E>(
        &self,
        mut classify: impl FnMut(&E) -> Classification,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    attempt += 1;
                    let rate_limited = match classify(&error) {
                        Classification::GiveUp => return Err(error),
                        Classification::Retry { rate_limited } => rate_limited,
                    };
                    if attempt >= self.max_attempts {
                        return Err(error);
                    }
                    let base = if rate_limited {
                        self.rate_limited_base_delay
                    } else {
                        self.base_delay
                    };
                    let exponential = base * 2u32.pow(attempt - 1);
                    let jitter = if self.jitter_fraction > 0.0 {
                        rand::rng().random_range(0.0..self.jitter_fraction)
                    } else {
                        0.0
                    };
                    let jittered = exponential.mul_f64(1.0 + jitter).min(self.max_wait);
                    tokio::time::sleep(jittered).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retry_with_backoff_gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), &str> = retry_with_backoff(3, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err("boom") }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_with_backoff_from_doubles_from_the_given_base_delay() {
        let attempts = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let result: Result<(), &str> = retry_with_backoff_from(3, Duration::from_secs(2), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err("boom") }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 2s then 4s between the three attempts: 6s elapsed once exhausted.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_with_backoff_returns_first_success() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(3, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient")
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_retries_with_zero_jitter_fraction() {
        // The OCR reasoner's policy uses `jitter_fraction: 0.0`; that must
        // not make the jitter range empty.
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            rate_limited_base_delay: Duration::from_secs(1),
            jitter_fraction: 0.0,
            max_wait: Duration::from_secs(4),
        };
        let attempts = AtomicU32::new(0);
        let result = policy
            .run(
                |_: &&str| Classification::Retry { rate_limited: false },
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    async move { if n < 2 { Err("transient") } else { Ok("ok") } }
                },
            )
            .await;
        assert_eq!(result, Ok("ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_gives_up_immediately_on_give_up_classification() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            rate_limited_base_delay: Duration::from_secs(4),
            jitter_fraction: 0.5,
            max_wait: Duration::from_secs(30),
        };
        let attempts = AtomicU32::new(0);
        let result: Result<(), &str> = policy
            .run(
                |_| Classification::GiveUp,
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err("schema invalid") }
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
