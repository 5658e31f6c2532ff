// Per-lane request pacing. Each lane tracks its own last-request instant;
// N lanes together approach but never exceed N times the per-lane rate,
// which keeps the invariant local instead of coordinating a global bucket.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub struct RateLimiter {
    min_spacing: Duration,
    lanes: Vec<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(lane_count: usize, min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            lanes: (0..lane_count).map(|_| Mutex::new(None)).collect(),
        }
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Block until this lane is allowed to issue its next request, then
    /// stamp the slot as taken.
    ///
    /// Panics if `lane` is out of range; lanes are fixed at construction.
    pub async fn wait_slot(&self, lane: usize) {
        let mut last = self.lanes[lane].lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_spacing {
                let wait = self.min_spacing - elapsed;
                debug!(lane, wait_ms = wait.as_millis() as u64, "Rate limit: pacing request");
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_slot_is_immediate() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let started = Instant::now();
        limiter.wait_slot(0).await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn second_slot_waits_out_the_spacing() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));
        limiter.wait_slot(0).await;

        let started = Instant::now();
        limiter.wait_slot(0).await;
        assert!(started.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn lanes_are_paced_independently() {
        let limiter = RateLimiter::new(2, Duration::from_millis(200));
        limiter.wait_slot(0).await;

        // A different lane is not held up by lane 0's stamp.
        let started = Instant::now();
        limiter.wait_slot(1).await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
