//! CSV-backed fetcher.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use quotecache_core::{Bar, CacheKey, DataFetcher, DateRange, FetchError, FetchedSeries};
use quotecache_engine::VolatileCache;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// CSV row format.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Fetches bars from CSV files in a directory.
///
/// For a key `instrument:freq:adj` the first existing file of
/// `<instrument>_<freq>_<adj>.csv`, `<instrument>_<adj>.csv` and
/// `<instrument>.csv` is read.
#[derive(Clone)]
pub struct CsvFetcher {
    dir: PathBuf,
    parsed: Option<Arc<ParsedFiles>>,
}

/// Parsed files kept in memory, keyed by path.
pub type ParsedFiles = VolatileCache<PathBuf, Arc<Vec<Bar>>>;

impl CsvFetcher {
    /// Create a new CSV fetcher rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            parsed: None,
        }
    }

    /// Reuse parsed files from `parsed` until they expire there.
    pub fn with_parsed_files(mut self, parsed: Arc<ParsedFiles>) -> Self {
        self.parsed = Some(parsed);
        self
    }

    /// Directory searched for files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn candidates(&self, key: &CacheKey) -> [PathBuf; 3] {
        let instrument = &key.instrument;
        [
            self.dir
                .join(format!("{}_{}_{}.csv", instrument, key.frequency, key.adjustment)),
            self.dir.join(format!("{}_{}.csv", instrument, key.adjustment)),
            self.dir.join(format!("{}.csv", instrument)),
        ]
    }

    /// Path of the file that would serve `key`.
    pub fn locate(&self, key: &CacheKey) -> Option<PathBuf> {
        self.candidates(key).into_iter().find(|p| p.is_file())
    }
}

#[async_trait]
impl DataFetcher for CsvFetcher {
    async fn fetch(&self, key: &CacheKey, range: DateRange) -> Result<FetchedSeries, FetchError> {
        let path = self
            .locate(key)
            .ok_or_else(|| FetchError::SymbolNotFound(key.instrument.clone()))?;
        debug!(key = %key, path = %path.display(), range = %range, "Reading CSV");

        let all = self.read(path).await?;
        let bars = all
            .iter()
            .filter(|b| range.contains(b.date()))
            .copied()
            .collect();

        Ok(FetchedSeries::new(key.instrument.clone(), bars))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

impl CsvFetcher {
    async fn read(&self, path: PathBuf) -> Result<Arc<Vec<Bar>>, FetchError> {
        if let Some(bars) = self.parsed.as_ref().and_then(|p| p.get(&path)) {
            return Ok(bars);
        }

        let (path, bars) = tokio::task::spawn_blocking(move || {
            let bars = load_bars(&path);
            (path, bars)
        })
        .await
        .map_err(|e| FetchError::Internal(e.to_string()))?;
        let bars = Arc::new(bars?);

        if let Some(parsed) = &self.parsed {
            parsed.put(path, Arc::clone(&bars), None);
        }
        Ok(bars)
    }
}

/// Read every row of a CSV file, sorted by time.
fn load_bars(path: &Path) -> Result<Vec<Bar>, FetchError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| FetchError::Parse(format!("{}: {}", path.display(), e)))?;

    let mut bars = Vec::new();
    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.map_err(|e| FetchError::Parse(format!("{}: {}", path.display(), e)))?;
        let timestamp = parse_timestamp(&row.date).ok_or_else(|| {
            FetchError::Parse(format!("row {}: bad date {:?}", line + 1, row.date))
        })?;
        bars.push(Bar::new(timestamp, row.open, row.high, row.low, row.close, row.volume));
    }

    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Parse the common date formats or a unix timestamp into milliseconds.
fn parse_timestamp(value: &str) -> Option<i64> {
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            return Some(d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    // Unix seconds or milliseconds
    let ts = value.parse::<i64>().ok()?;
    if ts > 10_000_000_000 {
        Some(ts)
    } else {
        ts.checked_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotecache_core::{Adjustment, Frequency};
    use std::fs;

    const SAMPLE: &str = "Date,Open,High,Low,Close,Volume\n\
        2024-02-06,2,2,2,2,200\n\
        2024-02-05,1,1,1,1,100\n\
        2024-02-07,3,3,3,3,300\n\
        2024-02-08,4,4,4,4,400\n";

    fn range(a: u32, b: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 2, a).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, b).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2024-01-15"), Some(1_705_276_800_000));
        assert_eq!(parse_timestamp("20240115"), Some(1_705_276_800_000));
        assert!(parse_timestamp("2024-01-15 10:30:00").is_some());
        assert_eq!(parse_timestamp("1705312800000"), Some(1_705_312_800_000));
        assert_eq!(parse_timestamp("1705312800"), Some(1_705_312_800_000));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("-86400"), Some(-86_400_000));
        // Out of range once scaled to milliseconds
        assert_eq!(parse_timestamp(&i64::MIN.to_string()), None);
    }

    #[tokio::test]
    async fn test_fetch_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sh600000.csv"), SAMPLE).unwrap();

        let fetcher = CsvFetcher::new(dir.path());
        let series = fetcher
            .fetch(&CacheKey::daily("sh600000"), range(5, 7))
            .await
            .unwrap();

        assert_eq!(series.name, "sh600000");
        let closes: Vec<f64> = series.bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_adjusted_file_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("usAAPL.csv"), SAMPLE).unwrap();
        fs::write(
            dir.path().join("usAAPL_hfq.csv"),
            "date,open,high,low,close\n2024-02-05,9,9,9,9\n",
        )
        .unwrap();

        let fetcher = CsvFetcher::new(dir.path());
        let key = CacheKey::new("usAAPL", Frequency::Daily, Adjustment::Backward);
        let series = fetcher.fetch(&key, range(1, 29)).await.unwrap();
        assert_eq!(series.bars.len(), 1);
        assert_eq!(series.bars[0].close, 9.0);
        assert_eq!(series.bars[0].volume, 0.0);

        // Other adjustments fall back to the plain file
        let raw = fetcher.fetch(&CacheKey::daily("usAAPL"), range(1, 29)).await.unwrap();
        assert_eq!(raw.bars.len(), 4);
    }

    #[tokio::test]
    async fn test_parsed_files_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sh600000.csv");
        fs::write(&path, SAMPLE).unwrap();

        let parsed = Arc::new(ParsedFiles::new(std::time::Duration::from_secs(60)));
        let fetcher = CsvFetcher::new(dir.path()).with_parsed_files(Arc::clone(&parsed));
        let key = CacheKey::daily("sh600000");

        assert_eq!(fetcher.fetch(&key, range(1, 29)).await.unwrap().bars.len(), 4);
        assert_eq!(parsed.len(), 1);

        // Served from memory while the entry lives
        fs::write(&path, "Date,Open,High,Low,Close\n2024-02-05,1,1,1,1\n").unwrap();
        assert_eq!(fetcher.fetch(&key, range(1, 29)).await.unwrap().bars.len(), 4);

        parsed.clear();
        assert_eq!(fetcher.fetch(&key, range(1, 29)).await.unwrap().bars.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_symbol_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CsvFetcher::new(dir.path());
        let err = fetcher
            .fetch(&CacheKey::daily("nope"), range(1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::SymbolNotFound(s) if s == "nope"));
    }

    #[tokio::test]
    async fn test_bad_row_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bad.csv"),
            "Date,Open,High,Low,Close\n2024-02-05,1,1,1,not-a-number\n",
        )
        .unwrap();

        let fetcher = CsvFetcher::new(dir.path());
        let err = fetcher
            .fetch(&CacheKey::daily("bad"), range(1, 29))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
