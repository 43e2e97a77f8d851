//! Per-upstream request spacing
//!
//! Each caller reserves the next free slot under the lock, then sleeps
//! outside it, so concurrent callers queue in arrival order.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces requests to one upstream at least `min_interval` apart
#[derive(Debug)]
pub struct RateLimiter {
    upstream: &'static str,
    next_slot: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(upstream: &'static str, min_interval: Duration) -> Self {
        Self {
            upstream,
            next_slot: Mutex::new(None),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for this caller's slot; returns how long it waited
    pub async fn acquire(&self) -> Duration {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.min_interval);
            slot
        };

        let delay = slot.saturating_duration_since(Instant::now());
        if !delay.is_zero() {
            tracing::debug!(
                upstream = self.upstream,
                delay_ms = delay.as_millis() as u64,
                "Spacing upstream request"
            );
            tokio::time::sleep_until(slot).await;
        }
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new("test", Duration::from_millis(500));
        assert!(limiter.acquire().await.is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced() {
        let limiter = RateLimiter::new("test", Duration::from_millis(200));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        let second = start.elapsed();
        limiter.acquire().await;
        let third = start.elapsed();

        assert!(second >= Duration::from_millis(200));
        assert!(third >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_get_distinct_slots() {
        let limiter = Arc::new(RateLimiter::new("test", Duration::from_millis(100)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap());
        }
        finished.sort();
        assert!(finished[1] >= Duration::from_millis(100));
        assert!(finished[2] >= Duration::from_millis(200));
    }
}
