//! Freshness policy for persistent records.

use chrono::{DateTime, TimeDelta, Utc};

/// Time-to-live policy.
///
/// A stale record is not discarded; it only forces the tail of the series to
/// be re-fetched on next access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TtlPolicy {
    ttl: Option<TimeDelta>,
}

impl TtlPolicy {
    /// Build from seconds; `0` means records never go stale.
    pub fn from_secs(ttl_seconds: u64) -> Self {
        if ttl_seconds == 0 {
            return Self::never();
        }
        let secs = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        Self {
            ttl: TimeDelta::try_seconds(secs),
        }
    }

    /// Records never go stale.
    pub fn never() -> Self {
        Self { ttl: None }
    }

    /// Configured time-to-live, if any.
    pub fn ttl(&self) -> Option<TimeDelta> {
        self.ttl
    }

    /// `now - fetched_at > ttl`.
    pub fn is_stale(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now.signed_duration_since(fetched_at) > ttl,
            None => false,
        }
    }
}
