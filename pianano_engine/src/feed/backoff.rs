use std::time::Duration;

pub const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(10);
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_millis(2000);
pub const RECONNECT_GROWTH_FACTOR: f64 = 1.3;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 100_000;

/// The delay schedule between feed connection attempts.
///
/// Delays start short, grow by a fixed factor per failed attempt and cap out, so a flapping node
/// is rejoined quickly while a dead one is not hammered. The ceiling is huge but finite; running
/// it out means the node is gone and the process has no reason to live.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    initial: Duration,
    max: Duration,
    growth: f64,
    ceiling: u32,
    attempts: u32,
    current: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(INITIAL_RECONNECT_DELAY, RECONNECT_GROWTH_FACTOR, MAX_RECONNECT_DELAY, MAX_RECONNECT_ATTEMPTS)
    }
}

impl ReconnectPolicy {
    pub fn new(initial: Duration, growth: f64, max: Duration, ceiling: u32) -> Self {
        Self { initial, max, growth, ceiling, attempts: 0, current: initial }
    }

    /// The delay to wait before the next attempt, or `None` once the ceiling is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.ceiling {
            return None;
        }
        self.attempts += 1;
        let delay = self.current;
        self.current = self.current.mul_f64(self.growth).min(self.max);
        Some(delay)
    }

    /// Called after a successful connection so the next outage starts from scratch.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current = self.initial;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn delays_are_non_decreasing_and_capped() {
        let mut policy = ReconnectPolicy::default();
        let mut last = Duration::ZERO;
        for _ in 0..50 {
            let delay = policy.next_delay().unwrap();
            assert!(delay >= last, "{delay:?} < {last:?}");
            assert!(delay <= MAX_RECONNECT_DELAY);
            last = delay;
        }
        assert_eq!(last, MAX_RECONNECT_DELAY);
    }

    #[test]
    fn ceiling_exhausts() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(1), 2.0, Duration::from_millis(10), 3);
        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_some());
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempts(), 3);
    }

    #[test]
    fn reset_restarts_the_schedule() {
        let mut policy = ReconnectPolicy::default();
        for _ in 0..20 {
            policy.next_delay();
        }
        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_delay(), Some(INITIAL_RECONNECT_DELAY));
    }
}
