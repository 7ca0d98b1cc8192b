// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate dispatch rate cap shared by every worker.
//!
//! A token bucket with lazy refill: capacity equals the per-second rate, so
//! at most one second's worth of dispatches can burst after an idle period.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Async token-bucket limiter.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    per_second: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// A limiter admitting `per_second` acquisitions per second. Starts full.
    pub fn per_second(per_second: u32) -> Self {
        let rate = f64::from(per_second.max(1));
        Self {
            capacity: rate,
            per_second: rate,
            bucket: Mutex::new(Bucket {
                tokens: rate,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one permit, waiting until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.capacity);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.per_second)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a permit only if one is available now.
    pub async fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.capacity);
        bucket.last_refill = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn burst_then_throttle() {
        let limiter = RateLimiter::per_second(5);
        for _ in 0..5 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);

        let start = Instant::now();
        limiter.acquire().await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(199), "waited {waited:?}");
        assert!(waited <= Duration::from_millis(201), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn shared_limiter_caps_aggregate_rate() {
        let limiter = Arc::new(RateLimiter::per_second(10));
        let start = Instant::now();

        let tasks: Vec<_> = (0..30)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // 10 from the initial burst, 20 more at 10/s.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1_990), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2_200), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_refills_up_to_capacity() {
        let limiter = RateLimiter::per_second(3);
        for _ in 0..3 {
            limiter.acquire().await;
        }
        tokio::time::advance(Duration::from_secs(10)).await;
        for _ in 0..3 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);
    }
}
