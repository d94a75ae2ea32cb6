//! Cache identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Adjustment, Frequency};

/// Identity of one growable series.
///
/// A key never carries a date range: every request for the same instrument,
/// frequency and adjustment reads and extends the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    /// Instrument identifier (e.g. `sh600000`, `usAAPL`)
    pub instrument: String,
    /// Sampling frequency
    pub frequency: Frequency,
    /// Price adjustment mode
    pub adjustment: Adjustment,
}

impl CacheKey {
    /// Create a new key.
    pub fn new(
        instrument: impl Into<String>,
        frequency: Frequency,
        adjustment: Adjustment,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            frequency,
            adjustment,
        }
    }

    /// Daily, forward-adjusted key for an instrument.
    pub fn daily(instrument: impl Into<String>) -> Self {
        Self::new(instrument, Frequency::Daily, Adjustment::Forward)
    }
}

/// Canonical storage form: `instrument:frequency:adjustment`.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.instrument, self.frequency, self.adjustment)
    }
}

impl FromStr for CacheKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split from the right so instruments containing ':' survive.
        let mut parts = s.rsplitn(3, ':');
        let adjustment = parts.next().ok_or_else(|| format!("Invalid cache key: {}", s))?;
        let frequency = parts.next().ok_or_else(|| format!("Invalid cache key: {}", s))?;
        let instrument = parts.next().ok_or_else(|| format!("Invalid cache key: {}", s))?;
        if instrument.is_empty() {
            return Err(format!("Invalid cache key: {}", s));
        }

        Ok(Self {
            instrument: instrument.to_string(),
            frequency: frequency.parse()?,
            adjustment: adjustment.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_and_parse() {
        let key = CacheKey::new("sh600000", Frequency::Daily, Adjustment::Forward);
        assert_eq!(key.to_string(), "sh600000:1d:qfq");
        assert_eq!(CacheKey::from_str("sh600000:1d:qfq").unwrap(), key);
    }

    #[test]
    fn test_key_with_colon_in_instrument() {
        let key = CacheKey::new("fu:AU0", Frequency::Weekly, Adjustment::None);
        let parsed: CacheKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_key_rejects_garbage() {
        assert!(CacheKey::from_str("sh600000").is_err());
        assert!(CacheKey::from_str(":1d:qfq").is_err());
        assert!(CacheKey::from_str("sh600000:2x:qfq").is_err());
    }
}
