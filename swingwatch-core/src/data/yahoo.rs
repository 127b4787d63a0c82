//! Yahoo Finance data provider.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API by range and interval
//! (`range=1y&interval=1d`, `range=30d&interval=30m`). One request per call;
//! failures are reported to the circuit breaker and returned, never retried.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV provider is the fallback when Yahoo is unavailable.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, Timeframe};
use crate::domain::Bar;
use chrono::DateTime;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at another chart endpoint (mirrors, local fixtures).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chart_url(&self, symbol: &str, timeframe: Timeframe, range: &str) -> String {
        format!(
            "{}/{symbol}?range={range}&interval={}&includePrePost=false",
            self.base_url,
            timeframe.code()
        )
    }

    /// Parse the chart API response into bars.
    ///
    /// Rows with any null price (holidays, halted or still-forming intervals)
    /// are dropped. A null volume reads as 0.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A valid symbol with no trades in range has no timestamp array.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let timestamp = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
            })?;

            let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
            let (Some(open), Some(high), Some(low), Some(close)) = (
                field(&quote.open),
                field(&quote.high),
                field(&quote.low),
                field(&quote.close),
            ) else {
                continue;
            };

            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: field(&quote.volume).map_or(0, |v| v.max(0.0) as u64),
            });
        }

        Ok(bars)
    }

    fn request(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        range: &str,
    ) -> Result<Vec<Bar>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = self.chart_url(symbol, timeframe, range);
        let resp = self.client.get(&url).send().map_err(|e| {
            self.circuit_breaker.record_failure();
            DataError::NetworkUnreachable(e.to_string())
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            return Err(DataError::RateLimited);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            // Unknown symbol; does not count against the breaker.
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(DataError::Http {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            self.circuit_breaker.record_failure();
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let bars = Self::parse_response(symbol, chart)?;
        self.circuit_breaker.record_success();
        Ok(bars)
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        range: &str,
    ) -> Result<Vec<Bar>, DataError> {
        self.request(symbol, timeframe, range)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<Bar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("7203.T", resp)
    }

    #[test]
    fn parses_intraday_rows_and_skips_incomplete_ones() {
        let bars = parse(
            r#"{"chart":{"result":[{"timestamp":[1717374600,1717376400,1717378200],
            "indicators":{"quote":[{
              "open":[2900.0,null,2910.0],
              "high":[2915.0,null,2920.0],
              "low":[2895.0,null,2905.0],
              "close":[2910.0,null,null],
              "volume":[120000,null,3000]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].timestamp.timestamp(), 1717374600);
        assert_eq!(bars[0].close, 2910.0);
        assert_eq!(bars[0].volume, 120000);
    }

    #[test]
    fn row_with_close_but_null_low_is_dropped() {
        let bars = parse(
            r#"{"chart":{"result":[{"timestamp":[1717374600,1717376400],
            "indicators":{"quote":[{
              "open":[2900.0,2910.0],
              "high":[2915.0,2920.0],
              "low":[null,2905.0],
              "close":[2910.0,2915.0],
              "volume":[120000,null]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].low, 2905.0);
        assert_eq!(bars[0].volume, 0);
        assert!(bars.iter().all(|b| !b.is_void()));
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn other_error_is_format_change() {
        let err = parse(r#"{"chart":{"result":null,"error":null}}"#).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn missing_timestamps_means_no_bars() {
        let bars =
            parse(r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn url_carries_range_and_interval() {
        let breaker = Arc::new(CircuitBreaker::default());
        let provider = YahooProvider::new(breaker, Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9/chart/");
        assert_eq!(
            provider.chart_url("6758.T", Timeframe::Intraday(30), "30d"),
            "http://localhost:9/chart/6758.T?range=30d&interval=30m&includePrePost=false"
        );
    }

    #[test]
    fn tripped_breaker_fails_fast() {
        let breaker = Arc::new(CircuitBreaker::default());
        breaker.trip();
        let provider = YahooProvider::new(breaker, Duration::from_secs(5)).unwrap();
        assert!(!provider.is_available());
        assert!(matches!(
            provider.fetch("7203.T", Timeframe::Daily, "1y"),
            Err(DataError::CircuitBreakerTripped)
        ));
    }
}
