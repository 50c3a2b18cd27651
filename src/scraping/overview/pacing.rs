//! Request pacing: a process-wide minimum spacing gate plus the fixed
//! jittered delays injected at navigation milestones.
//!
//! These are policy constants, not adaptive signals. There is no backoff and
//! no learning; the point is to keep request timing away from obviously
//! mechanical patterns, nothing more.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::core::config;

/// Inclusive millisecond range a milestone delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draw a uniform delay from the range.
    pub fn sample(&self) -> Duration {
        let ms = if self.min_ms >= self.max_ms {
            self.min_ms
        } else {
            use rand::RngExt;
            let mut rng = rand::rng();
            rng.random_range(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }

    /// Sleep for a freshly sampled delay.
    pub async fn wait(&self, label: &str) {
        let delay = self.sample();
        debug!("{} delay: {}ms", label, delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

/// Every timing constant of the anti-detection policy in one place, so the
/// pacing behavior is auditable without reading navigation code.
#[derive(Debug, Clone, Copy)]
pub struct PacingPolicy {
    /// Minimum spacing between gated navigations.
    pub min_request_spacing: Duration,
    /// Wait before the first navigation hop.
    pub pre_nav: DelayRange,
    /// Reading pause after the homepage loads.
    pub homepage: DelayRange,
    /// Pause after the results page loads, covering late-rendered content.
    pub content: DelayRange,
    /// Default delay between batch queries.
    pub inter_query: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            min_request_spacing: Duration::from_millis(5000),
            pre_nav: DelayRange::new(2000, 5000),
            homepage: DelayRange::new(3000, 5000),
            content: DelayRange::new(4000, 6000),
            inter_query: Duration::from_millis(3000),
        }
    }
}

impl PacingPolicy {
    /// Defaults with the environment overrides applied.
    pub fn from_env() -> Self {
        Self {
            min_request_spacing: Duration::from_millis(config::min_request_spacing_ms()),
            inter_query: Duration::from_millis(config::batch_delay_ms()),
            ..Self::default()
        }
    }
}

/// Process-wide last-request state. `gate()` holds the lock across the
/// wait so concurrent callers serialize through the check-then-record
/// critical section.
pub struct RateGate {
    min_spacing: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last: Mutex::new(None),
        }
    }

    /// Suspend until at least `min_spacing` has elapsed since the previous
    /// gated call returned, then record the new timestamp.
    pub async fn gate(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_spacing {
                let wait = self.min_spacing - elapsed;
                debug!("Waiting {}ms to avoid detection", wait.as_millis());
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults_match_the_documented_constants() {
        let policy = PacingPolicy::default();
        assert_eq!(policy.min_request_spacing, Duration::from_millis(5000));
        assert_eq!(policy.pre_nav, DelayRange::new(2000, 5000));
        assert_eq!(policy.homepage, DelayRange::new(3000, 5000));
        assert_eq!(policy.content, DelayRange::new(4000, 6000));
        assert_eq!(policy.inter_query, Duration::from_millis(3000));
    }

    #[test]
    fn sample_stays_inside_the_range() {
        let range = DelayRange::new(200, 700);
        for _ in 0..100 {
            let d = range.sample().as_millis() as u64;
            assert!((200..=700).contains(&d), "sampled {}ms", d);
        }
    }

    #[test]
    fn degenerate_range_samples_its_minimum() {
        assert_eq!(DelayRange::new(500, 500).sample(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn second_gate_call_waits_out_the_spacing() {
        let gate = RateGate::new(Duration::from_millis(5000));

        gate.gate().await;
        let before = Instant::now();
        gate.gate().await;
        assert!(before.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn gate_does_not_wait_after_spacing_already_elapsed() {
        let gate = RateGate::new(Duration::from_millis(5000));

        gate.gate().await;
        tokio::time::sleep(Duration::from_millis(6000)).await;

        let before = Instant::now();
        gate.gate().await;
        assert!(before.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn first_gate_call_passes_immediately() {
        let gate = RateGate::new(Duration::from_millis(5000));
        let before = Instant::now();
        gate.gate().await;
        assert!(before.elapsed() < Duration::from_millis(100));
    }
}
