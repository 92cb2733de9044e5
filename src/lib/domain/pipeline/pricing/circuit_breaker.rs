//! Three-state circuit breaker, one instance per pricing-source adapter.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    failure_count: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    open_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            open_timeout,
            inner: Mutex::new(Inner {
                state: State::Closed,
                failure_count: 0,
                opened_at: None,
            }),
        }
    }

    /// Whether a call may be attempted right now. OPEN returns false until
    /// `open_timeout` elapses, at which point it transitions to HALF-OPEN
    /// and returns true for exactly the next probe.
    pub async fn available(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::Closed => true,
            State::HalfOpen => true,
            State::Open => {
                let opened_at = inner.opened_at.expect("opened_at set when entering OPEN");
                if Instant::now().duration_since(opened_at) >= self.open_timeout {
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = State::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
    }

    pub async fn on_failure(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
            }
            State::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.failure_threshold {
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        for _ in 0..4 {
            breaker.on_failure().await;
            assert!(breaker.available().await);
        }
        breaker.on_failure().await;
        assert!(!breaker.available().await);
    }

    #[tokio::test(start_paused = true)]
    async fn success_in_closed_state_resets_failure_count() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        for _ in 0..4 {
            breaker.on_failure().await;
        }
        breaker.on_success().await;
        for _ in 0..4 {
            breaker.on_failure().await;
        }
        assert!(breaker.available().await);
    }

    #[tokio::test(start_paused = true)]
    async fn transitions_to_half_open_then_closed_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.on_failure().await;
        assert!(!breaker.available().await);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(breaker.available().await);
        breaker.on_success().await;
        assert!(breaker.available().await);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_probe_failure_reopens_the_circuit() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.on_failure().await;
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(breaker.available().await);
        breaker.on_failure().await;
        assert!(!breaker.available().await);
    }
}
