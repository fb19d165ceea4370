use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Attempt cap and exponential backoff for model calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_backoff: Duration,
    /// Ceiling for any single delay, hints included
    pub max_backoff: Duration,
    /// Multiplier per further attempt
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts,
            base_backoff,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the next one.
    ///
    /// `base * factor^(attempt-1)`, raised to `hint` when the provider asked for longer,
    /// then capped at `max_backoff`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let scaled = self.base_backoff.as_secs_f64() * self.backoff_factor.powi(exponent);
        let cap = self.max_backoff.as_secs_f64();
        let mut delay = if scaled.is_finite() { scaled.min(cap) } else { cap };
        if let Some(hint) = hint {
            delay = delay.max(hint.as_secs_f64().min(cap));
        }
        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Whether attempt `attempt` (1-based) may be followed by another one
    #[must_use]
    pub const fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1, None), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2, None), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3, None), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::new(20, Duration::from_secs(1))
            .with_max_backoff(Duration::from_secs(10));
        assert_eq!(policy.delay_after(5, None), Duration::from_secs(10));
        assert_eq!(policy.delay_after(500, None), Duration::from_secs(10));
    }

    #[test]
    fn test_retry_after_hint_raises_delay_within_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_after(1, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(
            policy.delay_after(3, Some(Duration::from_millis(100))),
            Duration::from_secs(4)
        );
        assert_eq!(
            policy.delay_after(1, Some(Duration::from_secs(600))),
            DEFAULT_MAX_BACKOFF
        );
    }

    #[test]
    fn test_attempt_cap() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert!(policy.has_attempts_after(1));
        assert!(policy.has_attempts_after(2));
        assert!(!policy.has_attempts_after(3));
        assert_eq!(policy.delay_after(2, None), Duration::ZERO);
    }
}
