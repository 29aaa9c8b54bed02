//! Rate limiting for remote calls

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Gate in front of every remote call
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until the next call is permitted
    async fn acquire(&self);
}

/// Permits one call per `interval`. The first call goes through at once.
pub struct FixedInterval {
    interval: Duration,
    next: Mutex<Option<Instant>>,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl RateLimiter for FixedInterval {
    async fn acquire(&self) {
        // Holding the lock while sleeping queues concurrent callers in order.
        let mut next = self.next.lock().await;
        if let Some(at) = *next {
            tokio::time::sleep_until(at).await;
        }
        *next = Some(Instant::now() + self.interval);
    }
}

/// Never waits
#[derive(Debug, Default, Clone, Copy)]
pub struct Unthrottled;

#[async_trait]
impl RateLimiter for Unthrottled {
    async fn acquire(&self) {}
}
