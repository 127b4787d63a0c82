//! Indicator snapshots: the per-bar values the rules look at.
//!
//! Rules only ever compare the last two bars of a series, so the snapshot
//! builder computes the full indicator series once and hands back the pair.

use serde::{Deserialize, Serialize};

use crate::domain::{closes, Bar};
use crate::indicators::{simple_moving_average, wilder_rsi, IndicatorError};
use crate::params::MaPair;

/// Indicator values at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub short_ma: f64,
    pub long_ma: f64,
    pub rsi: Option<f64>,
    pub close: f64,
}

/// Snapshots for the second-to-last and last bar of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPair {
    pub prev: IndicatorSnapshot,
    pub curr: IndicatorSnapshot,
}

/// Build the last two snapshots of `bars` for an MA pair, with RSI when
/// `rsi_period` is given.
///
/// Returns `Ok(None)` when either bar still sits in the long window's warm-up
/// region (insufficient history); errors only on malformed input.
pub fn last_two_snapshots(
    bars: &[Bar],
    pair: MaPair,
    rsi_period: Option<usize>,
) -> Result<Option<SnapshotPair>, IndicatorError> {
    let closes = closes(bars);
    let short = simple_moving_average(&closes, pair.short)?;
    let long = simple_moving_average(&closes, pair.long)?;
    let rsi = rsi_period.map(|p| wilder_rsi(&closes, p)).transpose()?;

    let n = closes.len();
    if n < 2 {
        return Ok(None);
    }

    let at = |i: usize| -> Option<IndicatorSnapshot> {
        Some(IndicatorSnapshot {
            short_ma: short[i]?,
            long_ma: long[i]?,
            rsi: rsi.as_ref().map(|r| r[i]),
            close: closes[i],
        })
    };

    Ok(match (at(n - 2), at(n - 1)) {
        (Some(prev), Some(curr)) => Some(SnapshotPair { prev, curr }),
        _ => None,
    })
}
