//! Strategy parameters.
//!
//! Every threshold the rules and the state machine consult lives here, so one
//! engine covers the whole family of MA/RSI notifier variants by configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Side, TakeProfitLevel};

/// A short/long moving-average pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaPair {
    pub short: usize,
    pub long: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("{name}: short window {short} must be >= 1 and below long window {long}")]
    MaPair {
        name: &'static str,
        short: usize,
        long: usize,
    },

    #[error("rsi_period must be >= 1")]
    RsiPeriod,

    #[error("rsi bounds must satisfy 0 <= buy_max ({buy_max}) <= sell_min ({sell_min}) <= 100")]
    RsiBounds { buy_max: f64, sell_min: f64 },

    #[error("take-profit levels must satisfy 0 < tp1 ({tp1}) < tp2 ({tp2})")]
    TakeProfit { tp1: f64, tp2: f64 },

    #[error("sl_buffer {0} must be in [0, 1)")]
    StopBuffer(f64),

    #[error("swing_lookback must be >= 1")]
    SwingLookback,
}

/// Thresholds for trend filter, trigger, RSI reflex and exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub rsi_period: usize,
    /// Long reflex: previous RSI at or below this, then rising.
    pub rsi_buy_max: f64,
    /// Short reflex: previous RSI at or above this, then falling.
    pub rsi_sell_min: f64,
    /// First take-profit distance as a fraction of entry (0.03 = 3%).
    pub tp1: f64,
    pub tp2: f64,
    /// Bars searched for the swing low/high that anchors the stop.
    pub swing_lookback: usize,
    /// Fractional buffer placed beyond the swing level (0.001 = 0.1%).
    pub sl_buffer: f64,
    /// Minimum trend-timeframe history before a ticker is evaluated.
    pub min_trend_bars: usize,
    /// Minimum trigger-timeframe history before a ticker is evaluated.
    pub min_trigger_bars: usize,
    // Tables last so the struct serializes to TOML.
    /// MA pair on the slow (trend) timeframe.
    pub trend: MaPair,
    /// MA pair on the fast (trigger) timeframe.
    pub trigger: MaPair,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            trend: MaPair { short: 20, long: 50 },
            trigger: MaPair { short: 5, long: 20 },
            rsi_period: 14,
            rsi_buy_max: 40.0,
            rsi_sell_min: 60.0,
            tp1: 0.03,
            tp2: 0.05,
            swing_lookback: 20,
            sl_buffer: 0.001,
            min_trend_bars: 60,
            min_trigger_bars: 50,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, pair) in [("trend", self.trend), ("trigger", self.trigger)] {
            if pair.short == 0 || pair.short >= pair.long {
                return Err(ParamsError::MaPair {
                    name,
                    short: pair.short,
                    long: pair.long,
                });
            }
        }
        if self.rsi_period == 0 {
            return Err(ParamsError::RsiPeriod);
        }
        if !(0.0..=100.0).contains(&self.rsi_buy_max)
            || !(0.0..=100.0).contains(&self.rsi_sell_min)
            || self.rsi_buy_max > self.rsi_sell_min
        {
            return Err(ParamsError::RsiBounds {
                buy_max: self.rsi_buy_max,
                sell_min: self.rsi_sell_min,
            });
        }
        if !(self.tp1 > 0.0 && self.tp2 > self.tp1) {
            return Err(ParamsError::TakeProfit {
                tp1: self.tp1,
                tp2: self.tp2,
            });
        }
        if !(0.0..1.0).contains(&self.sl_buffer) {
            return Err(ParamsError::StopBuffer(self.sl_buffer));
        }
        if self.swing_lookback == 0 {
            return Err(ParamsError::SwingLookback);
        }
        Ok(())
    }

    /// Trend bars needed: the configured floor, and never fewer than one more
    /// than the long window so two consecutive snapshots exist.
    pub fn required_trend_bars(&self) -> usize {
        self.min_trend_bars.max(self.trend.long + 1)
    }

    /// Trigger bars needed, same rule as [`required_trend_bars`](Self::required_trend_bars).
    pub fn required_trigger_bars(&self) -> usize {
        self.min_trigger_bars.max(self.trigger.long + 1)
    }

    /// Take-profit target price for `level` on a position of `side`.
    pub fn take_profit_target(&self, side: Side, entry: f64, level: TakeProfitLevel) -> f64 {
        let pct = match level {
            TakeProfitLevel::First => self.tp1,
            TakeProfitLevel::Second => self.tp2,
        };
        match side {
            Side::Long => entry * (1.0 + pct),
            Side::Short => entry * (1.0 - pct),
        }
    }
}
