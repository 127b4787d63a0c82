//! CSV file provider for offline runs.
//!
//! Reads `{dir}/{symbol}_{timeframe}.csv`, e.g. `data/7203.T_30m.csv`, with a
//! header row `timestamp,open,high,low,close,volume`. Timestamps are RFC 3339
//! or plain `YYYY-MM-DD` (taken as midnight UTC). The range argument is
//! ignored: the file is the range.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::provider::{DataError, DataProvider, Timeframe};
use crate::domain::Bar;

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: Option<f64>,
    #[serde(default)]
    volume: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir.join(format!("{symbol}_{}.csv", timeframe.code()))
    }

    fn read(path: &Path) -> Result<Vec<Bar>, DataError> {
        let io_err = |message: String| DataError::Io {
            path: path.display().to_string(),
            message,
        };
        let mut reader = csv::Reader::from_path(path).map_err(|e| io_err(e.to_string()))?;

        let mut bars = Vec::new();
        for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| io_err(format!("row {}: {e}", line + 1)))?;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| {
                io_err(format!("row {}: bad timestamp '{}'", line + 1, row.timestamp))
            })?;
            bars.push(Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close.unwrap_or(f64::NAN),
                volume: row.volume.unwrap_or(0),
            });
        }
        Ok(bars)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        _range: &str,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Self::read(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_rfc3339_and_date_rows() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvProvider::new(dir.path());
        fs::write(
            provider.path_for("7203.T", Timeframe::Daily),
            "timestamp,open,high,low,close,volume\n\
             2024-06-03,2900,2950,2880,2940,1000\n\
             2024-06-04T00:00:00+09:00,2940,2960,2920,,\n",
        )
        .unwrap();

        let bars = provider.fetch("7203.T", Timeframe::Daily, "1y").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 2940.0);
        assert_eq!(bars[0].volume, 1000);
        assert_eq!(bars[1].timestamp.to_rfc3339(), "2024-06-03T15:00:00+00:00");
        assert!(bars[1].close.is_nan());
        assert_eq!(bars[1].volume, 0);
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvProvider::new(dir.path());
        assert!(matches!(
            provider.fetch("6503.T", Timeframe::Intraday(30), "30d"),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn bad_timestamp_is_reported_with_row() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvProvider::new(dir.path());
        fs::write(
            provider.path_for("6503.T", Timeframe::Daily),
            "timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n",
        )
        .unwrap();
        let err = provider.fetch("6503.T", Timeframe::Daily, "1y").unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
