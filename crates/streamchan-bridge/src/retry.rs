use std::time::Duration;

/// How a bridge loop reacts to transient I/O faults.
///
/// Each transient fault increments a counter which resets on the next
/// packet that crosses the stream. The `n`-th fault in a row waits
/// `initial_delay * multiplier^(n - 1)` (capped at `max_delay`) before the
/// operation is retried. Packets that fail to encode or decode are always
/// skipped and never count toward the limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Transient faults tolerated in a row before the loop gives up. `None` never
    /// gives up.
    pub max_consecutive_faults: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the delay between retries.
    pub max_delay: Duration,
    /// Growth factor applied per consecutive fault.
    pub multiplier: u32,
}

impl RetryPolicy {
    /// Default policy: 16 transient faults in a row, 10ms doubling up to 1s.
    pub fn new() -> Self {
        Self {
            max_consecutive_faults: Some(16),
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }

    /// Retry forever with no delay.
    pub fn immediate() -> Self {
        Self {
            max_consecutive_faults: None,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1,
        }
    }

    /// Stop on the first transient fault.
    pub fn never() -> Self {
        Self {
            max_consecutive_faults: Some(0),
            ..Self::immediate()
        }
    }

    /// Override the consecutive fault limit.
    pub fn with_max_consecutive_faults(mut self, limit: Option<u32>) -> Self {
        self.max_consecutive_faults = limit;
        self
    }

    /// Override the first retry delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Override the retry delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Returns true if `consecutive` faults in a row are still tolerated.
    pub fn allows(&self, consecutive: u32) -> bool {
        self.max_consecutive_faults
            .map_or(true, |limit| consecutive <= limit)
    }

    /// Delay before retrying after the `consecutive`-th fault in a row.
    pub fn delay_for(&self, consecutive: u32) -> Duration {
        if consecutive == 0 {
            return Duration::ZERO;
        }
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(consecutive.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
        assert_eq!(policy.delay_for(4), Duration::from_millis(80));
        assert_eq!(policy.delay_for(8), Duration::from_secs(1));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn default_limit() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(16));
        assert!(!policy.allows(17));
    }

    #[test]
    fn immediate_never_gives_up() {
        let policy = RetryPolicy::immediate();
        assert!(policy.allows(u32::MAX));
        assert_eq!(policy.delay_for(100), Duration::ZERO);
    }

    #[test]
    fn never_stops_on_first_fault() {
        let policy = RetryPolicy::never();
        assert!(policy.allows(0));
        assert!(!policy.allows(1));
    }

    #[test]
    fn builder_overrides() {
        let policy = RetryPolicy::new()
            .with_max_consecutive_faults(Some(2))
            .with_initial_delay(Duration::from_millis(5))
            .with_max_delay(Duration::from_millis(12));
        assert!(!policy.allows(3));
        assert_eq!(policy.delay_for(2), Duration::from_millis(10));
        assert_eq!(policy.delay_for(3), Duration::from_millis(12));
    }
}
