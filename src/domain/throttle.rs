//! Low-load mode for long batch scans.
//!
//! A duty cycle: after a unit of work that took `t`, idle long enough that
//! work makes up `cpu_limit` percent of wall time on one core.

use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    cpu_limit: u32,
}

impl Throttle {
    /// `cpu_limit` is a percentage of one core, clamped to 1..=100.
    /// 100 disables throttling.
    pub fn new(cpu_limit: u32) -> Self {
        Self {
            cpu_limit: cpu_limit.clamp(1, 100),
        }
    }

    pub fn disabled() -> Self {
        Self::new(100)
    }

    pub fn cpu_limit(&self) -> u32 {
        self.cpu_limit
    }

    pub fn is_enabled(&self) -> bool {
        self.cpu_limit < 100
    }

    /// Idle time owed for `work`: `work * (100 / cpu_limit - 1)`.
    pub fn pause_for(&self, work: Duration) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        let factor = 100.0 / f64::from(self.cpu_limit) - 1.0;
        work.mul_f64(factor)
    }

    /// Sleep off the idle time owed for `work`.
    pub fn after_work(&self, work: Duration) {
        let pause = self.pause_for(work);
        if !pause.is_zero() {
            trace!(?work, ?pause, "throttling");
            std::thread::sleep(pause);
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_core_idles_three_times_the_work() {
        let t = Throttle::new(25);
        assert_eq!(t.pause_for(Duration::from_millis(100)), Duration::from_millis(300));
    }

    #[test]
    fn half_core_idles_as_long_as_the_work() {
        let t = Throttle::new(50);
        assert_eq!(t.pause_for(Duration::from_millis(40)), Duration::from_millis(40));
    }

    #[test]
    fn full_core_never_idles() {
        let t = Throttle::disabled();
        assert!(!t.is_enabled());
        assert_eq!(t.pause_for(Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(Throttle::new(0).cpu_limit(), 1);
        assert_eq!(Throttle::new(250).cpu_limit(), 100);
    }
}
