use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::collection_error::CollectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Days,
    Weeks,
}

impl FromStr for WindowUnit {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(WindowUnit::Days),
            "week" | "weeks" => Ok(WindowUnit::Weeks),
            _ => Err(CollectionError::InvalidArgument(format!(
                "date-window units '{s}' is not a valid unit, must be either 'day[s]' or 'week[s]'"
            ))),
        }
    }
}

/// Relative range length, e.g. `2 weeks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub count: u32,
    pub unit: WindowUnit,
}

impl DateWindow {
    pub const ONE_DAY: DateWindow = DateWindow {
        count: 1,
        unit: WindowUnit::Days,
    };

    pub fn parse(count: &str, unit: &str) -> Result<Self, CollectionError> {
        if count.is_empty() || !count.chars().all(|c| c.is_ascii_digit()) {
            return Err(CollectionError::InvalidArgument(format!(
                "date-window period '{count}' must be a whole number"
            )));
        }
        let count: u32 = count.parse().map_err(|_| {
            CollectionError::InvalidArgument(format!("date-window period '{count}' is too large"))
        })?;
        if count == 0 {
            return Err(CollectionError::InvalidArgument(
                "date-window period must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            count,
            unit: unit.parse()?,
        })
    }

    pub fn days(&self) -> u64 {
        match self.unit {
            WindowUnit::Days => u64::from(self.count),
            WindowUnit::Weeks => u64::from(self.count) * 7,
        }
    }
}

/// Half-open range of calendar days `[start, end_exclusive)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionWindow {
    start: NaiveDate,
    end_exclusive: NaiveDate,
}

impl CollectionWindow {
    pub fn new(start: NaiveDate, end_exclusive: NaiveDate) -> Result<Self, CollectionError> {
        if end_exclusive <= start {
            return Err(CollectionError::InvalidArgument(format!(
                "collection window starting {start} must cover at least one day"
            )));
        }
        Ok(Self {
            start,
            end_exclusive,
        })
    }

    /// Window covering `start` through `last`, both inclusive.
    pub fn inclusive(start: NaiveDate, last: NaiveDate) -> Result<Self, CollectionError> {
        let end_exclusive = last.succ_opt().ok_or_else(|| {
            CollectionError::InvalidArgument(format!("end date {last} is out of range"))
        })?;
        Self::new(start, end_exclusive)
    }

    pub fn from_date_window(start: NaiveDate, window: DateWindow) -> Result<Self, CollectionError> {
        let end_exclusive = start
            .checked_add_days(Days::new(window.days()))
            .ok_or_else(|| {
                CollectionError::InvalidArgument(format!(
                    "date-window of {} days from {start} is out of range",
                    window.days()
                ))
            })?;
        Self::new(start, end_exclusive)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end_exclusive(&self) -> NaiveDate {
        self.end_exclusive
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end_exclusive.pred_opt().unwrap_or(self.start)
    }

    pub fn day_count(&self) -> i64 {
        (self.end_exclusive - self.start).num_days()
    }

    /// Calendar days in ascending order, stepping one civil day at a time.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_exclusive;
        self.start.iter_days().take_while(move |day| *day < end)
    }
}

impl fmt::Display for CollectionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.last_day())
    }
}

/// Epoch seconds of the first instant of `day` in `tz`.
///
/// When local midnight falls in a DST gap the day starts at the first
/// valid local time after it.
pub fn start_of_day_epoch(day: NaiveDate, tz: &Tz) -> i64 {
    let midnight = day.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp(),
        LocalResult::None => (1..=3)
            .filter_map(|hour| {
                tz.from_local_datetime(&(midnight + chrono::Duration::hours(hour)))
                    .earliest()
            })
            .map(|dt| dt.timestamp())
            .next()
            .unwrap_or_else(|| midnight.and_utc().timestamp()),
    }
}

/// Instant and local calendar date of an epoch-seconds timestamp.
pub fn local_datetime(epoch_secs: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp(epoch_secs, 0).map(|utc| utc.with_timezone(tz))
}
