//! Time sources
//!
//! The handler never reads the system clock directly, so store expiry and age
//! derivation can be driven deterministically.

use std::cell::Cell;
use std::time::{Duration, Instant};

use chrono::{FixedOffset, Local, NaiveDate, Offset, Utc};

/// Source of the current time
pub trait Clock {
    /// Monotonic time, used for metric expiry
    fn now(&self) -> Instant;

    /// Calendar day, used to derive the age
    fn today(&self) -> NaiveDate;

    /// Offset applied to timestamps that carry none
    fn local_offset(&self) -> FixedOffset;
}

/// Wall clock of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn local_offset(&self) -> FixedOffset {
        *Local::now().offset()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Cell<Duration>,
    today: Cell<NaiveDate>,
    offset: FixedOffset,
}

impl ManualClock {
    /// Create a clock frozen on `today`, in UTC
    pub fn new(today: NaiveDate) -> Self {
        Self {
            start: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            today: Cell::new(today),
            offset: Utc.fix(),
        }
    }

    /// Use a different local offset
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Move monotonic time forward
    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    /// Change the calendar day
    pub fn set_today(&self, today: NaiveDate) {
        self.today.set(today);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed.get()
    }

    fn today(&self) -> NaiveDate {
        self.today.get()
    }

    fn local_offset(&self) -> FixedOffset {
        self.offset
    }
}
