//! Time source and calendar-day helpers.

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};

/// Source of "now" for the store and the aggregator
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock in the local timezone
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to a single instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Local midnight at the start of `date`.
///
/// When a DST transition skips midnight, the first valid instant of the
/// wall-clock reading is used instead.
pub fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    let naive = date.and_time(NaiveTime::MIN);
    match naive.and_local_timezone(Local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => Local.from_utc_datetime(&naive),
    }
}

/// Normalize an instant to local midnight of its day
pub fn start_of_day(at: DateTime<Local>) -> DateTime<Local> {
    local_midnight(at.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};

    #[test]
    fn test_start_of_day_normalizes() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let afternoon = local_midnight(date) + Duration::hours(15) + Duration::minutes(42);

        let normalized = start_of_day(afternoon);
        assert_eq!(normalized.date_naive(), date);
        assert_eq!(normalized.hour(), 0);
        assert_eq!(normalized.minute(), 0);
    }

    #[test]
    fn test_fixed_clock_today() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let clock = FixedClock(local_midnight(date) + Duration::hours(9));
        assert_eq!(clock.today(), date);
    }
}
