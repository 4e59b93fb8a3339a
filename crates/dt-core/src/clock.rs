//! Injectable wall clock.
//!
//! Ticks are stamped with a timestamp taken from a `Clock` passed in by the
//! caller, so tests can pin dates and times.

use std::cell::Cell;

use chrono::{Local, NaiveDateTime, TimeDelta};

/// Source of the current local date and time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The machine's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Deterministic clock for tests.
///
/// Returns `start` on the first call and advances by `step` after every call.
#[derive(Debug, Clone)]
pub struct FixedClock {
    next: Cell<NaiveDateTime>,
    step: TimeDelta,
}

impl FixedClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            next: Cell::new(start),
            step: TimeDelta::zero(),
        }
    }

    pub fn with_step(mut self, step: TimeDelta) -> Self {
        self.step = step;
        self
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        let now = self.next.get();
        self.next.set(now + self.step);
        now
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 50)
            .unwrap()
    }

    #[test]
    fn fixed_clock_without_step_is_constant() {
        let clock = FixedClock::new(start());
        assert_eq!(clock.now(), start());
        assert_eq!(clock.now(), start());
    }

    #[test]
    fn fixed_clock_steps_across_midnight() {
        let clock = FixedClock::new(start()).with_step(TimeDelta::seconds(10));
        assert_eq!(clock.now(), start());
        let second = clock.now();
        assert_eq!(second.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-02-01 00:00:00");
    }
}
