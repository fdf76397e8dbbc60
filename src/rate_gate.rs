use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

/// Calls per minute the Enphase API allows.
pub const PROVIDER_CALLS_PER_MINUTE: u64 = 10;

/// Remote calls made for each collected day (summary + stats).
pub const CALLS_PER_DAY: u64 = 2;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(15);

/// Smallest day-to-day spacing that keeps `CALLS_PER_DAY` under the
/// provider's per-minute ceiling.
pub fn provider_floor() -> Duration {
    Duration::from_secs(60 * CALLS_PER_DAY / PROVIDER_CALLS_PER_MINUTE)
}

/// Time source for the rate gate.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Local pacing for outbound calls.
///
/// `open` is called when a day's remote work starts and records the earliest
/// instant the next day may start; `wait` sleeps off whatever is left of that
/// interval once the day is done. The gate does not look at response headers
/// and never adapts its interval.
pub struct RateGate<C = SystemClock> {
    clock: C,
    min_interval: Duration,
    next_allowed: Option<Instant>,
}

impl<C: Clock> RateGate<C> {
    pub fn new(clock: C, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            next_allowed: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn open(&mut self) {
        self.next_allowed = Some(self.clock.now() + self.min_interval);
    }

    /// Sleeps until the interval opened by the last `open` has elapsed and
    /// returns how long it slept.
    pub async fn wait(&mut self) -> Duration {
        let Some(next_allowed) = self.next_allowed.take() else {
            return Duration::ZERO;
        };

        let remaining = next_allowed.saturating_duration_since(self.clock.now());
        if !remaining.is_zero() {
            debug!(
                remaining_ms = remaining.as_millis() as u64,
                "Waiting for rate limit window"
            );
            self.clock.sleep(remaining).await;
        }
        remaining
    }
}
