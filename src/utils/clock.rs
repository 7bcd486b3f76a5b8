//! Time sources and cancellable one-shot timers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond time source injected into every timed component
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time (milliseconds since the Unix epoch)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests and simulations.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// advance it while a component owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// One-shot deadline. Arming replaces any previous deadline; cancelling clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline_ms: Option<u64>,
}

impl Timer {
    pub fn new() -> Self {
        Self { deadline_ms: None }
    }

    pub fn arm(&mut self, now_ms: u64, delay_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(delay_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Returns `true` exactly once when the deadline has passed, disarming the timer
    pub fn fire_if_due(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1000);
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 1250);
        other.set(5);
        assert_eq!(clock.now_ms(), 5);
    }

    #[test]
    fn test_timer_fires_once() {
        let mut timer = Timer::new();
        timer.arm(100, 500);
        assert!(!timer.fire_if_due(599));
        assert!(timer.fire_if_due(600));
        assert!(!timer.fire_if_due(700));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_timer_cancel_and_rearm() {
        let mut timer = Timer::new();
        timer.arm(0, 500);
        timer.cancel();
        assert!(!timer.fire_if_due(1000));

        timer.arm(0, 500);
        timer.arm(400, 300);
        assert_eq!(timer.deadline_ms(), Some(700));
        assert!(!timer.fire_if_due(600));
        assert!(timer.fire_if_due(700));
    }
}
