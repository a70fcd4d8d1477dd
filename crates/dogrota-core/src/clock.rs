//! Calendar clock abstraction.
//!
//! The rotation depends on "today" in two places: which weekday slot a
//! report lands in, and whether a query has crossed into a new week. The
//! [`Clock`] trait keeps that dependency explicit so the service runs on
//! the local calendar in production ([`SystemClock`]) and on a date the
//! test controls ([`FixedClock`]).

use std::sync::{Mutex, PoisonError};

use chrono::{Days, Local, NaiveDate};

/// A source of the current calendar date.
pub trait Clock: Send + Sync {
    /// Today's date.
    fn today(&self) -> NaiveDate;
}

/// The local wall-clock calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to a settable date.
#[derive(Debug)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

impl FixedClock {
    /// Create a clock that reports `date` until told otherwise.
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    /// Move the clock to `date`.
    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap_or_else(PoisonError::into_inner) = date;
    }

    /// Move the clock forward by `days`, saturating at the end of the
    /// representable calendar.
    pub fn advance_days(&self, days: u64) {
        let mut guard = self.date.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = guard.checked_add_days(Days::new(days)) {
            *guard = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_and_advances() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.today(), start);

        clock.advance_days(2);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());

        clock.set(start);
        assert_eq!(clock.today(), start);
    }
}
