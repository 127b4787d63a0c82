//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single symbol at a single timeframe.
///
/// `timestamp` is the bar's open time in UTC. Daily bars carry the session's
/// midnight (or exchange open) as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }
}

/// Structural problems in a bar series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar series is empty")]
    Empty,

    #[error("bar {index} has a missing close")]
    MissingClose { index: usize },

    #[error("bar {index} has a missing high or low")]
    MissingRange { index: usize },

    #[error("bar {index} is not after its predecessor ({timestamp})")]
    NotMonotonic {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Check that a series is non-empty, has a finite close, high and low on every
/// bar and strictly increasing timestamps.
pub fn validate_series(bars: &[Bar]) -> Result<(), BarError> {
    if bars.is_empty() {
        return Err(BarError::Empty);
    }
    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() {
            return Err(BarError::MissingClose { index: i });
        }
        if !bar.high.is_finite() || !bar.low.is_finite() {
            return Err(BarError::MissingRange { index: i });
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(BarError::NotMonotonic {
                index: i,
                timestamp: bar.timestamp,
            });
        }
    }
    Ok(())
}

/// Put provider output into canonical order: drop void bars, sort by
/// timestamp, keep the last bar for any duplicated timestamp.
///
/// Providers occasionally repeat the in-progress bar at the end of an intraday
/// series; the later copy carries the fresher close.
pub fn canonicalize(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.retain(|b| !b.is_void());
    bars.sort_by_key(|b| b.timestamp);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.timestamp == bar.timestamp => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}

/// Closing prices of a series, in order.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
