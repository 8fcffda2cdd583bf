use async_trait::async_trait;
use std::time::Duration;

/// Pacing between upstream requests, applied by the orchestrator after each
/// (city, date) iteration.
#[async_trait]
pub trait Throttle: Send {
    async fn pause(&mut self);
}

/// Always waits the same interval, whatever happened in the iteration.
pub struct FixedDelay {
    interval: Duration,
}

impl FixedDelay {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&mut self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
pub mod counting {
    use super::*;

    /// Counts pauses without sleeping.
    #[derive(Default)]
    pub struct CountingThrottle {
        pub pauses: usize,
    }

    #[async_trait]
    impl Throttle for CountingThrottle {
        async fn pause(&mut self) {
            self.pauses += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn fixed_delay_waits_at_least_the_interval() {
        let mut throttle = FixedDelay::new(Duration::from_millis(20));

        let started = Instant::now();
        throttle.pause().await;

        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn zero_interval_returns_immediately() {
        let mut throttle = FixedDelay::new(Duration::ZERO);

        let started = Instant::now();
        throttle.pause().await;

        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
