//! Date ranges and request translation.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CacheError, CacheResult};

/// Inclusive calendar range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CacheResult<Self> {
        if start > end {
            return Err(CacheError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering a single day.
    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// First day of the range.
    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    #[inline]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Check whether `start <= end` holds. Always true for ranges built
    /// through [`DateRange::new`], but deserialized values bypass it.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Check if a date falls inside the range.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Check if `other` lies entirely inside this range.
    pub fn covers(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest range containing both.
    pub fn hull(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Number of calendar days in the range.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// What a caller asks for.
///
/// Open-ended "most recent N" requests are translated into an explicit range
/// before they reach the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// An explicit inclusive date range.
    Between(DateRange),
    /// The last `days` trading days ending at `end` (default: today).
    LastDays { days: u32, end: Option<NaiveDate> },
}

impl RangeRequest {
    /// Explicit range request.
    pub fn between(start: NaiveDate, end: NaiveDate) -> CacheResult<Self> {
        Ok(RangeRequest::Between(DateRange::new(start, end)?))
    }

    /// Most recent `days` trading days.
    pub fn last_days(days: u32) -> Self {
        RangeRequest::LastDays { days, end: None }
    }

    /// Translate into a concrete range.
    pub fn resolve(&self, today: NaiveDate) -> CacheResult<DateRange> {
        match *self {
            RangeRequest::Between(range) => Ok(range),
            RangeRequest::LastDays { days, end } => {
                if days == 0 {
                    return Err(CacheError::InvalidRequest(
                        "days must be at least 1".to_string(),
                    ));
                }
                let end = latest_trading_day(end.unwrap_or(today));
                let mut start = end;
                let mut remaining = days - 1;
                while remaining > 0 {
                    start = start.pred_opt().ok_or_else(|| {
                        CacheError::InvalidRequest(format!(
                            "{} days before {} is out of range",
                            days, end
                        ))
                    })?;
                    if is_trading_day(start) {
                        remaining -= 1;
                    }
                }
                DateRange::new(start, end)
            }
        }
    }
}

/// Latest trading reference day on or before `date` (weekends roll back to Friday).
pub fn latest_trading_day(date: NaiveDate) -> NaiveDate {
    let back = match date.weekday() {
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        _ => 0,
    };
    date.checked_sub_days(chrono::Days::new(back)).unwrap_or(date)
}

fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
