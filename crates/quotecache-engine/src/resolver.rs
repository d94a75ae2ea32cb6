//! Range resolution and merging.
//!
//! [`plan`] compares a requested range with what a record already covers and
//! returns the sub-ranges that must be fetched. [`merge`] folds the fetched
//! bars back into the record. Both are pure.

use chrono::{DateTime, NaiveDate, Utc};
use quotecache_core::{Bar, DateRange, FetchedSeries, SeriesRecord};
use std::collections::BTreeMap;
use std::fmt;

/// How a request relates to the cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// No usable record; the whole range is fetched.
    Miss,
    /// Fully covered and fresh; nothing is fetched.
    HitFull,
    /// Fully covered but stale; only the tail window is re-fetched.
    HitStale,
    /// Range extends past the covered end.
    PartialTail,
    /// Range starts before the covered start.
    PartialHead,
    /// Both head and tail are fetched.
    PartialBoth,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheOutcome::Miss => "miss",
            CacheOutcome::HitFull => "hit",
            CacheOutcome::HitStale => "hit_stale",
            CacheOutcome::PartialTail => "partial_tail",
            CacheOutcome::PartialHead => "partial_head",
            CacheOutcome::PartialBoth => "partial_both",
        };
        write!(f, "{}", s)
    }
}

/// Sub-ranges to fetch for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub outcome: CacheOutcome,
    /// Disjoint ranges, head first.
    pub segments: Vec<DateRange>,
}

impl FetchPlan {
    /// Check if nothing needs fetching.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Decide which sub-ranges of `requested` must be fetched.
///
/// `stale` comes from the TTL policy. When set, the window from the last
/// known bar up to `today` (or the covered end, if later) is always
/// re-fetched so revisions to the most recent period are picked up; older
/// data is trusted.
pub fn plan(
    record: Option<&SeriesRecord>,
    requested: DateRange,
    stale: bool,
    today: NaiveDate,
) -> FetchPlan {
    let Some((record, coverage)) = record.and_then(|r| r.coverage.map(|c| (r, c))) else {
        return FetchPlan {
            outcome: CacheOutcome::Miss,
            segments: vec![requested],
        };
    };

    let head = if requested.start() < coverage.start() {
        coverage
            .start()
            .pred_opt()
            .and_then(|end| DateRange::new(requested.start(), end).ok())
    } else {
        None
    };

    let refresh_from = record.last_bar_date().unwrap_or(coverage.end());
    let tail = if requested.end() > coverage.end() {
        let start = if stale {
            refresh_from
        } else {
            coverage.end().succ_opt().unwrap_or(coverage.end())
        };
        DateRange::new(start, requested.end()).ok()
    } else if stale {
        DateRange::new(refresh_from, today.max(coverage.end())).ok()
    } else {
        None
    };

    let outcome = match (head.is_some(), tail.is_some()) {
        (false, false) => CacheOutcome::HitFull,
        (false, true) if coverage.covers(&requested) => CacheOutcome::HitStale,
        (false, true) => CacheOutcome::PartialTail,
        (true, false) => CacheOutcome::PartialHead,
        (true, true) => CacheOutcome::PartialBoth,
    };

    FetchPlan {
        outcome,
        segments: head.into_iter().chain(tail).collect(),
    }
}

/// Fold fetched segments into `record`.
///
/// Bars are keyed by timestamp and a fetched bar replaces a stored one with
/// the same timestamp. Fetched bars outside the range they were fetched for
/// are dropped. Coverage grows to include every fetched range and never
/// shrinks. The latest non-empty fetched name replaces the stored name.
pub fn merge(
    record: Option<SeriesRecord>,
    fetched: Vec<(DateRange, FetchedSeries)>,
    now: DateTime<Utc>,
) -> SeriesRecord {
    let mut record = record.unwrap_or_else(|| SeriesRecord::empty(now));

    let mut by_ts: BTreeMap<i64, Bar> = record.bars.drain(..).map(|b| (b.timestamp, b)).collect();
    let mut coverage = record.coverage;

    for (range, series) in fetched {
        for bar in series.bars {
            if range.contains(bar.date()) {
                by_ts.insert(bar.timestamp, bar);
            }
        }
        coverage = Some(match coverage {
            Some(c) => c.hull(&range),
            None => range,
        });
        if !series.name.is_empty() {
            record.name = series.name;
        }
    }

    record.bars = by_ts.into_values().collect();
    record.coverage = coverage;
    record.fetched_at = now;
    record
}
