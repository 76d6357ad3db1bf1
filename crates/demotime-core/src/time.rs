//! Time sources: the wall clock and the business-day calendar.
//!
//! Both are traits so the engine can be driven with a fixed clock in tests.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

// ─── Clock ───────────────────────────────────────────────────────────────────

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
  now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
  pub fn new(now: DateTime<Utc>) -> Self { Self { now: Mutex::new(now) } }

  pub fn set(&self, now: DateTime<Utc>) {
    *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
    *now += by;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

// ─── Business days ───────────────────────────────────────────────────────────

pub trait BusinessCalendar: Send + Sync {
  /// The instant `n` business days after `from`, keeping the time of day.
  fn add_business_days(&self, from: DateTime<Utc>, n: u32) -> DateTime<Utc>;
}

/// Monday to Friday are business days; there are no holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdayCalendar;

impl WeekdayCalendar {
  fn is_business_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
  }
}

impl BusinessCalendar for WeekdayCalendar {
  fn add_business_days(&self, from: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    let mut at = from;
    let mut left = n;
    while left > 0 {
      at += Duration::days(1);
      if Self::is_business_day(at.weekday()) {
        left -= 1;
      }
    }
    at
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(day: u32) -> DateTime<Utc> {
    // October 2026: the 12th is a Monday.
    Utc.with_ymd_and_hms(2026, 10, day, 9, 30, 0).unwrap()
  }

  #[test]
  fn skips_weekends() {
    let cal = WeekdayCalendar;
    // Friday + 1 -> Monday
    assert_eq!(cal.add_business_days(at(16), 1), at(19));
    // Wednesday + 2 -> Friday
    assert_eq!(cal.add_business_days(at(14), 2), at(16));
    // Thursday + 2 -> Monday
    assert_eq!(cal.add_business_days(at(15), 2), at(19));
    // Saturday + 1 -> Monday
    assert_eq!(cal.add_business_days(at(17), 1), at(19));
  }

  #[test]
  fn zero_days_is_identity() {
    assert_eq!(WeekdayCalendar.add_business_days(at(17), 0), at(17));
  }

  #[test]
  fn fixed_clock_advances() {
    let clock = FixedClock::new(at(12));
    clock.advance(Duration::days(2));
    assert_eq!(clock.now(), at(14));
    clock.set(at(20));
    assert_eq!(clock.now(), at(20));
  }
}
