//! Swing high / swing low over a trailing lookback.
//!
//! Used to place protective stops at entry. With fewer than `lookback` bars
//! the whole series is used.

use super::IndicatorError;
use crate::domain::Bar;

fn tail(bars: &[Bar], lookback: usize) -> Result<&[Bar], IndicatorError> {
    if bars.is_empty() {
        return Err(IndicatorError::InsufficientData);
    }
    if lookback == 0 {
        return Err(IndicatorError::InvalidPeriod(lookback));
    }
    let start = bars.len().saturating_sub(lookback);
    let window = &bars[start..];
    if let Some(i) = window
        .iter()
        .position(|b| !b.low.is_finite() || !b.high.is_finite())
    {
        return Err(IndicatorError::NonFinite(start + i));
    }
    Ok(window)
}

/// Minimum `low` over the last `lookback` bars.
pub fn recent_swing_low(bars: &[Bar], lookback: usize) -> Result<f64, IndicatorError> {
    Ok(tail(bars, lookback)?
        .iter()
        .map(|b| b.low)
        .fold(f64::INFINITY, f64::min))
}

/// Maximum `high` over the last `lookback` bars.
pub fn recent_swing_high(bars: &[Bar], lookback: usize) -> Result<f64, IndicatorError> {
    Ok(tail(bars, lookback)?
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn swing_low_uses_only_lookback_window() {
        // lows are min(open, close) - 1
        let bars = make_bars(&[50.0, 100.0, 101.0, 102.0, 103.0]);
        // last 3 bars: (101,102,103) opens (100,101,102) → lows 99,100,101
        assert_eq!(recent_swing_low(&bars, 3).unwrap(), 99.0);
        // whole series: first bar low = 49
        assert_eq!(recent_swing_low(&bars, 10).unwrap(), 49.0);
    }

    #[test]
    fn swing_high_uses_only_lookback_window() {
        let bars = make_bars(&[200.0, 100.0, 101.0, 102.0]);
        // last 2 bars highs: max(100,101)+1=102, max(101,102)+1=103
        assert_eq!(recent_swing_high(&bars, 2).unwrap(), 103.0);
        // full: bar1 high = max(200,100)+1 = 201
        assert_eq!(recent_swing_high(&bars, 50).unwrap(), 201.0);
    }

    #[test]
    fn swing_rejects_empty() {
        assert_eq!(recent_swing_low(&[], 20), Err(IndicatorError::InsufficientData));
        assert_eq!(recent_swing_high(&[], 20), Err(IndicatorError::InsufficientData));
    }

    #[test]
    fn swing_rejects_zero_lookback() {
        let bars = make_bars(&[1.0]);
        assert_eq!(recent_swing_low(&bars, 0), Err(IndicatorError::InvalidPeriod(0)));
    }

    #[test]
    fn missing_low_in_window_is_an_error() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[3].low = f64::NAN;
        assert_eq!(recent_swing_low(&bars, 2), Err(IndicatorError::NonFinite(3)));
        // outside the window it does not matter
        assert_eq!(recent_swing_high(&bars[..3], 2).unwrap(), 13.0);
    }
}
