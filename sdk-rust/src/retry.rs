use std::time::Duration;

/// How the orchestrator paces retries across the fallback model rotation.
///
/// The delay grows linearly with the attempt number and is capped, so a full
/// rotation never stalls for long on a single model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry. Retry `k` waits `base_delay * k`.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Number of times the rotation may be walked through on retries.
    pub cycles: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(2000),
            cycles: 2,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub fn with_cycles(mut self, cycles: usize) -> Self {
        self.cycles = cycles;
        self
    }

    /// Delay to wait after the zero-based `attempt` failed.
    #[must_use]
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = u32::try_from(attempt.saturating_add(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Retries allowed after the first fallback call for a rotation of
    /// `model_count` models.
    #[must_use]
    pub fn max_retries(&self, model_count: usize) -> usize {
        model_count.saturating_mul(self.cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_linearly_and_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(usize::MAX), Duration::from_millis(2000));
    }

    #[test]
    fn retries_cover_two_rotations_by_default() {
        assert_eq!(RetryPolicy::default().max_retries(12), 24);
        assert_eq!(RetryPolicy::new().with_cycles(1).max_retries(3), 3);
    }
}
