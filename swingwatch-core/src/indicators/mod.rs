//! Indicator library.
//!
//! Pure functions over close prices or bars: no state, no I/O. Every function
//! returns a series the same length as its input so callers can index by bar.
//! A window longer than the input is not an error; the leading region is simply
//! undefined and the caller decides whether it has enough history.

pub mod rsi;
pub mod sma;
pub mod swing;

pub use rsi::wilder_rsi;
pub use sma::simple_moving_average;
pub use swing::{recent_swing_high, recent_swing_low};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: input series is empty")]
    InsufficientData,

    #[error("invalid period {0}: must be >= 1")]
    InvalidPeriod(usize),

    #[error("non-finite input value at index {0}")]
    NonFinite(usize),
}

/// Shared argument check for the close-based indicators.
pub(crate) fn check_input(values: &[f64], period: usize) -> Result<(), IndicatorError> {
    if values.is_empty() {
        return Err(IndicatorError::InsufficientData);
    }
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod(period));
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(IndicatorError::NonFinite(i));
    }
    Ok(())
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
/// Bars are 30 minutes apart.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::minutes(30 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
