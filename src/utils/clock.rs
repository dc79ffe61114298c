use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Settable clock for tests.
#[cfg(test)]
pub struct FixedClock(std::cell::Cell<NaiveDateTime>);

#[cfg(test)]
impl FixedClock {
    pub fn at(date: NaiveDate, h: u32, m: u32, s: u32) -> Self {
        Self(std::cell::Cell::new(date.and_hms_opt(h, m, s).unwrap()))
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.0.set(now);
    }

    pub fn advance_days(&self, days: i64) {
        self.0.set(self.0.get() + chrono::Duration::days(days));
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0.get()
    }
}
