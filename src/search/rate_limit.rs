use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Minimum-interval gate shared by every caller of one backend.
///
/// The lock is held across the sleep, so concurrent callers are serialized
/// and each observes the full interval after its predecessor.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// A limiter that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the minimum interval since the previous call has elapsed,
    /// then record this call.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("Rate limit: waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::disabled()
    }
}
