#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of translation timestamps (unix millis).
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_ms(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration,
            Err(_) => return 0,
        };

        i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Returns `start`, then advances by `step` on every read.
#[derive(Debug)]
pub struct ManualClock {
    next: AtomicI64,
    step: i64,
}

impl ManualClock {
    pub fn stepping(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
            step: 1,
        }
    }

    pub fn fixed(at: i64) -> Self {
        Self {
            next: AtomicI64::new(at),
            step: 0,
        }
    }

    pub fn set(&self, at: i64) {
        self.next.store(at, Ordering::SeqCst);
    }

    pub fn peek(&self) -> i64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.next.fetch_add(self.step, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_steps() {
        let clock = ManualClock::stepping(555);
        assert_eq!(clock.now_ms(), 555);
        assert_eq!(clock.now_ms(), 556);
        assert_eq!(clock.peek(), 557);

        let fixed = ManualClock::fixed(9);
        assert_eq!(fixed.now_ms(), 9);
        assert_eq!(fixed.now_ms(), 9);
    }
}
