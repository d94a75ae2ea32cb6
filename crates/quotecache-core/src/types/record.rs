//! Cached series records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Bar, DateRange};

/// The cached value for one key.
///
/// `bars` is strictly increasing by timestamp. `coverage` is the contiguous
/// range the record claims to have fully fetched; it may extend past the
/// first/last bar when the source has no data on some days, and is `None`
/// only for a record that never covered anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    /// Display name returned by the most recent fetch
    pub name: String,
    /// Ordered bars
    pub bars: Vec<Bar>,
    /// Claimed fetched range
    pub coverage: Option<DateRange>,
    /// Time of the most recent successful extension
    pub fetched_at: DateTime<Utc>,
}

impl SeriesRecord {
    /// A record with no data and no coverage.
    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self {
            name: String::new(),
            bars: Vec::new(),
            coverage: None,
            fetched_at,
        }
    }

    /// Get the number of bars.
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Check if the record holds no bars.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Date of the most recent bar.
    pub fn last_bar_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(Bar::date)
    }

    /// Date of the oldest bar.
    pub fn first_bar_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(Bar::date)
    }

    /// Bars whose date lies in `range`.
    pub fn slice(&self, range: &DateRange) -> Vec<Bar> {
        let lo = self.bars.partition_point(|b| b.date() < range.start());
        let hi = self.bars.partition_point(|b| b.date() <= range.end());
        self.bars[lo..hi.max(lo)].to_vec()
    }

    /// Check the record invariants, returning a description of the first
    /// violation.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(w) = self.bars.windows(2).find(|w| w[0].timestamp >= w[1].timestamp) {
            return Err(format!(
                "bars out of order or duplicated at timestamp {}",
                w[1].timestamp
            ));
        }

        match self.coverage {
            Some(coverage) => {
                if !coverage.is_ordered() {
                    return Err(format!("coverage {} is inverted", coverage));
                }
                let first = self.first_bar_date();
                let last = self.last_bar_date();
                if let (Some(first), Some(last)) = (first, last) {
                    if !coverage.contains(first) || !coverage.contains(last) {
                        return Err(format!(
                            "bars [{}, {}] fall outside coverage {}",
                            first, last, coverage
                        ));
                    }
                }
            }
            None if !self.bars.is_empty() => {
                return Err("record has bars but no coverage".to_string());
            }
            None => {}
        }

        Ok(())
    }
}

/// Result of one fetch for one sub-range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchedSeries {
    /// Display name reported by the source (may be empty)
    pub name: String,
    /// Bars returned by the source, oldest first
    pub bars: Vec<Bar>,
}

impl FetchedSeries {
    /// Create a fetched series.
    pub fn new(name: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            name: name.into(),
            bars,
        }
    }
}
