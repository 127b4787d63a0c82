//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a trailing window.
//! First defined value at index window-1.

use super::{check_input, IndicatorError};

/// Simple moving average of `closes` over `window` values.
///
/// `result[i]` is `Some(mean(closes[i+1-window..=i]))` for `i >= window - 1`
/// and `None` before that.
pub fn simple_moving_average(
    closes: &[f64],
    window: usize,
) -> Result<Vec<Option<f64>>, IndicatorError> {
    check_input(closes, window)?;

    let n = closes.len();
    let mut result = vec![None; n];
    if n < window {
        return Ok(result);
    }

    // Initial window sum, then roll forward. The window is re-summed every
    // `window` steps so rounding drift cannot accumulate over long series.
    let mut sum: f64 = closes[..window].iter().sum();
    result[window - 1] = Some(sum / window as f64);

    for i in window..n {
        if (i + 1) % window == 0 {
            sum = closes[(i + 1 - window)..=i].iter().sum();
        } else {
            sum += closes[i] - closes[i - window];
        }
        result[i] = Some(sum / window as f64);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let result = simple_moving_average(&closes, 5).unwrap();

        assert_eq!(result.len(), 7);
        for (i, v) in result.iter().enumerate().take(4) {
            assert!(v.is_none(), "expected None at index {i}");
        }
        // SMA[4] = mean(10,11,12,13,14) = 12.0
        assert_approx(result[4].unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(result[5].unwrap(), 13.0, DEFAULT_EPSILON);
        assert_approx(result[6].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let closes = [100.0, 200.0, 300.0];
        let result = simple_moving_average(&closes, 1).unwrap();
        assert_eq!(result, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }

    #[test]
    fn sma_window_longer_than_input_is_all_none() {
        let result = simple_moving_average(&[10.0, 11.0], 5).unwrap();
        assert_eq!(result, vec![None, None]);
    }

    #[test]
    fn sma_rejects_empty_and_zero_window() {
        assert_eq!(
            simple_moving_average(&[], 3),
            Err(IndicatorError::InsufficientData)
        );
        assert_eq!(
            simple_moving_average(&[1.0], 0),
            Err(IndicatorError::InvalidPeriod(0))
        );
        assert_eq!(
            simple_moving_average(&[1.0, f64::NAN], 1),
            Err(IndicatorError::NonFinite(1))
        );
    }

    #[test]
    fn sma_matches_naive_mean_on_long_series() {
        let closes: Vec<f64> = (0..500).map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0).collect();
        let result = simple_moving_average(&closes, 20).unwrap();
        for i in 19..closes.len() {
            let naive: f64 = closes[i - 19..=i].iter().sum::<f64>() / 20.0;
            assert_approx(result[i].unwrap(), naive, 1e-9);
        }
    }
}
