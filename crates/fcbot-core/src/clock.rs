//! Wall-clock access localized to the event timezone.

use chrono::{Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// A point in time reduced to what the bot cares about: the local
/// calendar date, weekday, and hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalMoment {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub hour: u32,
}

impl LocalMoment {
    /// Build a moment from a date and hour; the weekday follows the date.
    pub fn new(date: NaiveDate, hour: u32) -> Self {
        Self {
            date,
            weekday: date.weekday(),
            hour,
        }
    }
}

/// Source of the current local moment.
pub trait EventClock: Send + Sync {
    fn now(&self) -> LocalMoment;
}

/// Real clock localized to a fixed timezone.
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl EventClock for SystemClock {
    fn now(&self) -> LocalMoment {
        let local = Utc::now().with_timezone(&self.tz);
        LocalMoment {
            date: local.date_naive(),
            weekday: local.weekday(),
            hour: local.hour(),
        }
    }
}

/// Clock pinned to one moment, for tests and manual triggering.
pub struct FixedClock(pub LocalMoment);

impl EventClock for FixedClock {
    fn now(&self) -> LocalMoment {
        self.0
    }
}

/// The weekly event's place in the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSchedule {
    /// Event weekday.
    pub weekday: Weekday,
    /// Hour of the morning announcement; opens the submission window.
    pub morning_hour: u32,
    /// Hour of the one-hour reminder.
    pub one_hour_hour: u32,
    /// Hour of the starting announcement; closes the submission window.
    pub starting_hour: u32,
}

impl Default for EventSchedule {
    fn default() -> Self {
        Self {
            weekday: Weekday::Thu,
            morning_hour: 9,
            one_hour_hour: 14,
            starting_hour: 15,
        }
    }
}

impl EventSchedule {
    /// Whether requests and attendance changes are currently accepted:
    /// the event weekday, from the morning hour through the end of the
    /// starting hour (9:00-15:59 with the defaults).
    pub fn submission_window_contains(&self, moment: &LocalMoment) -> bool {
        moment.weekday == self.weekday
            && moment.hour >= self.morning_hour
            && moment.hour <= self.starting_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-04 was a Thursday
    fn thursday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()
    }

    #[test]
    fn test_local_moment_weekday_follows_date() {
        let m = LocalMoment::new(thursday(), 10);
        assert_eq!(m.weekday, Weekday::Thu);
        let m = LocalMoment::new(thursday().succ_opt().unwrap(), 10);
        assert_eq!(m.weekday, Weekday::Fri);
    }

    #[test]
    fn test_window_bounds() {
        let schedule = EventSchedule::default();
        for (hour, expected) in [(8, false), (9, true), (12, true), (15, true), (16, false)] {
            let m = LocalMoment::new(thursday(), hour);
            assert_eq!(
                schedule.submission_window_contains(&m),
                expected,
                "hour {hour}"
            );
        }
    }

    #[test]
    fn test_window_requires_event_weekday() {
        let schedule = EventSchedule::default();
        let friday = LocalMoment::new(thursday().succ_opt().unwrap(), 10);
        assert!(!schedule.submission_window_contains(&friday));
    }
}
