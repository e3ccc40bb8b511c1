//! # Clock
//!
//! Time source for record timestamps. The catalog never reads the system
//! time directly, so tests can drive it with [`ManualClock`].

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current UTC time.
pub trait Clock: std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A deterministic clock that advances by a fixed step on every read.
///
/// Two consecutive reads never return the same instant, which keeps
/// `updated_at > created_at` checks meaningful in tests.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
    step_millis: i64,
}

impl ManualClock {
    /// Start at `start`, advancing one second per read.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self::with_step(start, 1000)
    }

    /// Start at `start`, advancing `step_millis` per read.
    #[must_use]
    pub fn with_step(start: DateTime<Utc>, step_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
            step_millis,
        }
    }

    /// Jump to a specific instant; the next read returns it.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.fetch_add(self.step_millis, Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_per_read() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().expect("time");
        let clock = ManualClock::starting_at(start);
        let first = clock.now();
        let second = clock.now();
        assert_eq!(first, start);
        assert_eq!((second - first).num_milliseconds(), 1000);
    }

    #[test]
    fn manual_clock_set_jumps() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().expect("time");
        let later = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().expect("time");
        let clock = ManualClock::starting_at(start);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
