//! Fixed-window rate limiting for reservation attempts.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct Window {
    started: Instant,
    count: u32,
}

/// Per-key fixed-window rate limiter.
///
/// Keys are whatever the caller chooses to bucket by, typically the
/// customer email. State is in-process; each instance enforces its own
/// budget.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records an attempt. `Err` carries how long the caller should wait
    /// before the window resets.
    pub async fn check(&self, key: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| now.duration_since(w.started) < self.window);

        match windows.get_mut(key) {
            Some(window) => {
                if window.count >= self.max_requests {
                    let elapsed = now.duration_since(window.started);
                    return Err(self.window.saturating_sub(elapsed));
                }
                window.count += 1;
            }
            None => {
                windows.insert(
                    key.to_string(),
                    Window {
                        started: now,
                        count: 1,
                    },
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            limiter.check("ada@example.com").await.unwrap();
        }
        let retry_after = limiter.check("ada@example.com").await.unwrap_err();
        assert!(retry_after <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.check("ada@example.com").await.unwrap();
        limiter.check("grace@example.com").await.unwrap();
        assert!(limiter.check("ada@example.com").await.is_err());
    }

    #[tokio::test]
    async fn window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        limiter.check("ada@example.com").await.unwrap();
        assert!(limiter.check("ada@example.com").await.is_err());

        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.check("ada@example.com").await.unwrap();
    }
}
