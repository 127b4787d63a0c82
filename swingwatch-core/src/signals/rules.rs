//! Entry and exit rules.
//!
//! Pure predicates over two consecutive snapshots. An entry needs all of:
//! the slow-timeframe trend allows the side, the trigger pair crosses in that
//! direction on this bar, the close sits on the right side of the long MA, and
//! RSI shows a reflex out of the oversold (overbought) band.

use serde::{Deserialize, Serialize};

use super::snapshot::{IndicatorSnapshot, SnapshotPair};
use crate::domain::Side;
use crate::params::StrategyParams;

/// Golden cross: fast at or below slow on the previous bar, strictly above now.
///
/// A tie on the previous bar followed by fast > slow counts; a tie now does not.
pub fn crossed_up(prev_fast: f64, prev_slow: f64, curr_fast: f64, curr_slow: f64) -> bool {
    prev_fast <= prev_slow && curr_fast > curr_slow
}

/// Death cross: fast at or above slow on the previous bar, strictly below now.
pub fn crossed_down(prev_fast: f64, prev_slow: f64, curr_fast: f64, curr_slow: f64) -> bool {
    prev_fast >= prev_slow && curr_fast < curr_slow
}

/// RSI reflex thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiBand {
    pub buy_max: f64,
    pub sell_min: f64,
}

impl From<&StrategyParams> for RsiBand {
    fn from(p: &StrategyParams) -> Self {
        Self {
            buy_max: p.rsi_buy_max,
            sell_min: p.rsi_sell_min,
        }
    }
}

fn rsi_reflex(
    side: Side,
    prev: &IndicatorSnapshot,
    curr: &IndicatorSnapshot,
    band: RsiBand,
) -> bool {
    let (Some(p), Some(c)) = (prev.rsi, curr.rsi) else {
        return false;
    };
    match side {
        Side::Long => p <= band.buy_max && c > p,
        Side::Short => p >= band.sell_min && c < p,
    }
}

/// Entry rule for `side` on the current bar.
pub fn entry_signal(
    side: Side,
    prev: &IndicatorSnapshot,
    curr: &IndicatorSnapshot,
    trend_allowed: bool,
    band: RsiBand,
) -> bool {
    if !trend_allowed {
        return false;
    }
    match side {
        Side::Long => {
            crossed_up(prev.short_ma, prev.long_ma, curr.short_ma, curr.long_ma)
                && curr.close > curr.long_ma
                && rsi_reflex(side, prev, curr, band)
        }
        Side::Short => {
            crossed_down(prev.short_ma, prev.long_ma, curr.short_ma, curr.long_ma)
                && curr.close < curr.long_ma
                && rsi_reflex(side, prev, curr, band)
        }
    }
}

/// "Consider closing" rule for an open position on `side`: the trigger pair
/// crossed against it.
pub fn exit_cross_signal(side: Side, prev: &IndicatorSnapshot, curr: &IndicatorSnapshot) -> bool {
    match side {
        Side::Long => crossed_down(prev.short_ma, prev.long_ma, curr.short_ma, curr.long_ma),
        Side::Short => crossed_up(prev.short_ma, prev.long_ma, curr.short_ma, curr.long_ma),
    }
}

/// Which entry sides the slow timeframe currently allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrendBias {
    pub buy_allowed: bool,
    pub sell_allowed: bool,
}

impl TrendBias {
    /// Bias from the latest slow-timeframe snapshot: short MA above long MA
    /// allows longs, below allows shorts, equal allows neither.
    pub fn from_snapshot(curr: &IndicatorSnapshot) -> Self {
        Self {
            buy_allowed: curr.short_ma > curr.long_ma,
            sell_allowed: curr.short_ma < curr.long_ma,
        }
    }

    pub fn allows(&self, side: Side) -> bool {
        match side {
            Side::Long => self.buy_allowed,
            Side::Short => self.sell_allowed,
        }
    }
}

/// All rule outcomes for one bar, as consumed by the position state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalSet {
    pub long_entry: bool,
    pub short_entry: bool,
    pub exit_long: bool,
    pub exit_short: bool,
}

impl SignalSet {
    /// Evaluate every rule on a trigger snapshot pair.
    ///
    /// Without a trend bias (exit-monitor pass) no entry can fire.
    pub fn evaluate(trigger: &SnapshotPair, bias: Option<TrendBias>, band: RsiBand) -> Self {
        let (prev, curr) = (&trigger.prev, &trigger.curr);
        let allowed = |side: Side| bias.is_some_and(|b| b.allows(side));
        Self {
            long_entry: entry_signal(Side::Long, prev, curr, allowed(Side::Long), band),
            short_entry: entry_signal(Side::Short, prev, curr, allowed(Side::Short), band),
            exit_long: exit_cross_signal(Side::Long, prev, curr),
            exit_short: exit_cross_signal(Side::Short, prev, curr),
        }
    }

    pub fn entry(&self, side: Side) -> bool {
        match side {
            Side::Long => self.long_entry,
            Side::Short => self.short_entry,
        }
    }

    pub fn exit(&self, side: Side) -> bool {
        match side {
            Side::Long => self.exit_long,
            Side::Short => self.exit_short,
        }
    }
}
