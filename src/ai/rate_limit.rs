use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::models::ProviderId;

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by provider.
pub struct RateLimiter {
    window: Duration,
    windows: Mutex<HashMap<ProviderId, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one call for `key` if fewer than `limit` were recorded in the
    /// current window. Returns `false` without recording when the limit is reached.
    pub async fn try_acquire(&self, key: ProviderId, limit: u32) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let entry = windows.entry(key).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        if entry.count >= limit {
            return false;
        }
        entry.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn blocks_after_limit_until_window_rolls() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        assert!(limiter.try_acquire(ProviderId::DeepSeek, 2).await);
        assert!(limiter.try_acquire(ProviderId::DeepSeek, 2).await);
        assert!(!limiter.try_acquire(ProviderId::DeepSeek, 2).await);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!limiter.try_acquire(ProviderId::DeepSeek, 2).await);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire(ProviderId::DeepSeek, 2).await);
        assert!(limiter.try_acquire(ProviderId::DeepSeek, 2).await);
        assert!(!limiter.try_acquire(ProviderId::DeepSeek, 2).await);
    }

    #[tokio::test]
    async fn providers_are_counted_separately() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        assert!(limiter.try_acquire(ProviderId::Gemini, 1).await);
        assert!(!limiter.try_acquire(ProviderId::Gemini, 1).await);
        assert!(limiter.try_acquire(ProviderId::Claude, 1).await);
        assert!(!limiter.try_acquire(ProviderId::Claude, 1).await);
    }
}
