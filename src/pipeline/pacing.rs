use rand::Rng;
use std::time::Duration;

/// Inclusive range a randomized pause is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange { min: Duration::ZERO, max: Duration::ZERO };

    /// Negative or inverted bounds are clamped so sampling never panics.
    pub fn from_secs(min_secs: f64, max_secs: f64) -> Self {
        let min = Duration::from_secs_f64(min_secs.max(0.0));
        let max = Duration::from_secs_f64(max_secs.max(0.0)).max(min);
        Self { min, max }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self { min: delay, max: delay }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rng.gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Samples a pause and sleeps for it, returning the slept duration.
    pub async fn pause<R: Rng>(&self, rng: &mut R) -> Duration {
        let delay = self.sample(rng);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        delay
    }
}
