//! Sampling frequency and price adjustment modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampling frequency of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Frequency {
    /// 1 minute bars
    #[serde(rename = "1m")]
    Minute1,
    /// 5 minute bars
    #[serde(rename = "5m")]
    Minute5,
    /// 15 minute bars
    #[serde(rename = "15m")]
    Minute15,
    /// 30 minute bars
    #[serde(rename = "30m")]
    Minute30,
    /// 60 minute bars
    #[serde(rename = "60m")]
    Minute60,
    /// Daily bars
    #[serde(rename = "1d")]
    #[default]
    Daily,
    /// Weekly bars
    #[serde(rename = "1w")]
    Weekly,
    /// Monthly bars
    #[serde(rename = "1M")]
    Monthly,
}

impl Frequency {
    /// Check if this is an intraday frequency.
    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Frequency::Minute1
                | Frequency::Minute5
                | Frequency::Minute15
                | Frequency::Minute30
                | Frequency::Minute60
        )
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Minute1 => "1m",
            Frequency::Minute5 => "5m",
            Frequency::Minute15 => "15m",
            Frequency::Minute30 => "30m",
            Frequency::Minute60 => "60m",
            Frequency::Daily => "1d",
            Frequency::Weekly => "1w",
            Frequency::Monthly => "1M",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" is month, every other spelling is case-insensitive
        if s == "1M" {
            return Ok(Frequency::Monthly);
        }
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "minute" => Ok(Frequency::Minute1),
            "5m" | "5min" => Ok(Frequency::Minute5),
            "15m" | "15min" => Ok(Frequency::Minute15),
            "30m" | "30min" => Ok(Frequency::Minute30),
            "60m" | "60min" | "1h" | "hour" => Ok(Frequency::Minute60),
            "1d" | "day" | "daily" => Ok(Frequency::Daily),
            "1w" | "week" | "weekly" => Ok(Frequency::Weekly),
            "month" | "monthly" => Ok(Frequency::Monthly),
            _ => Err(format!("Invalid frequency: {}", s)),
        }
    }
}

/// Price adjustment applied by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Adjustment {
    /// Forward-adjusted (qfq)
    #[default]
    #[serde(rename = "qfq")]
    Forward,
    /// Backward-adjusted (hfq)
    #[serde(rename = "hfq")]
    Backward,
    /// Raw prices
    None,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Adjustment::Forward => "qfq",
            Adjustment::Backward => "hfq",
            Adjustment::None => "none",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Adjustment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qfq" | "forward" => Ok(Adjustment::Forward),
            "hfq" | "backward" => Ok(Adjustment::Backward),
            "none" | "raw" | "" => Ok(Adjustment::None),
            _ => Err(format!("Invalid adjustment: {}", s)),
        }
    }
}
