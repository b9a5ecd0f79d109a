//! Minimum spacing between outbound calls to the remote sites.
//!
//! Two delay classes share ONE clock: a `General` slot requested right
//! after a `Heavy` one only waits the general delay, measured from the
//! heavy request.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::tasks::RateClass;

pub struct RateLimiter {
    general: Duration,
    heavy: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(general: Duration, heavy: Duration) -> Self {
        Self {
            general,
            heavy,
            last_request: Mutex::new(None),
        }
    }

    pub fn delay(&self, class: RateClass) -> Duration {
        match class {
            RateClass::General => self.general,
            RateClass::Heavy => self.heavy,
        }
    }

    /// Suspend until `delay(class)` has passed since the last recorded
    /// request, then record now. Waiters are served in arrival order.
    pub async fn await_slot(&self, class: RateClass) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            tokio::time::sleep_until(prev + self.delay(class)).await;
        }
        let now = Instant::now();
        *last = Some(match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }

    pub async fn last_request(&self) -> Option<Instant> {
        *self.last_request.lock().await
    }
}
