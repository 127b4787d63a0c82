//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Smoothing starts from a zero state, so the first `period` values lean on
//! simple averages implicitly and converge after warm-up.
//! Edge cases: first sample → 50; avg_loss == 0 → 100.

use super::{check_input, IndicatorError};

/// Wilder RSI of `closes` with smoothing factor `1 / period`.
///
/// The output has the same length as the input and every value lies in
/// `[0, 100]`.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    check_input(closes, period)?;

    let alpha = 1.0 / period as f64;
    let mut result = Vec::with_capacity(closes.len());
    // No prior delta for the first sample.
    result.push(50.0);

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for pair in closes.windows(2) {
        let change = pair[1] - pair[0];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;

        result.push(compute_rsi(avg_gain, avg_loss));
    }

    Ok(result)
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}
