//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over bar sources (Yahoo Finance, CSV files,
//! in-memory fixtures) so the driver can swap implementations and tests can run
//! without a network.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("http {status} for {symbol}")]
    Http { symbol: String, status: u16 },

    #[error("io error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("unsupported timeframe '{0}'")]
    UnsupportedTimeframe(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Bar interval requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    Daily,
    Intraday(u32),
}

impl Timeframe {
    /// Provider interval code, e.g. `1d` or `30m`.
    pub fn code(&self) -> String {
        match self {
            Timeframe::Daily => "1d".to_string(),
            Timeframe::Intraday(m) => format!("{m}m"),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl FromStr for Timeframe {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("1d") {
            return Ok(Timeframe::Daily);
        }
        match s.strip_suffix('m').map(str::parse::<u32>) {
            Some(Ok(minutes)) if minutes > 0 => Ok(Timeframe::Intraday(minutes)),
            _ => Err(DataError::UnsupportedTimeframe(s.to_string())),
        }
    }
}

impl TryFrom<String> for Timeframe {
    type Error = DataError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.code()
    }
}

/// Trait for bar sources.
///
/// `range` is a lookback span in the provider's notation (`1y`, `30d`).
/// Implementations return whatever the source has; the driver canonicalizes
/// and checks history length.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str, timeframe: Timeframe, range: &str)
        -> Result<Vec<Bar>, DataError>;

    /// False while the source is refusing requests (circuit breaker open). The
    /// driver stops fetching for the rest of the run.
    fn is_available(&self) -> bool {
        true
    }
}

/// In-memory provider keyed by (symbol, timeframe). Ignores `range`.
#[derive(Debug, Default, Clone)]
pub struct StaticProvider {
    series: HashMap<(String, Timeframe), Vec<Bar>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.insert(symbol, timeframe, bars);
        self
    }

    pub fn insert(&mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        self.series.insert((symbol.to_string(), timeframe), bars);
    }
}

impl DataProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        _range: &str,
    ) -> Result<Vec<Bar>, DataError> {
        self.series
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}
