//! Per-ticker evaluation: bar series in, state machine input out.
//!
//! Checks history length, builds the trend bias from the slow series (when one
//! is given), evaluates the rules on the trigger series and measures the swing
//! levels. No I/O and no state.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{validate_series, Bar, BarError};
use crate::indicators::{recent_swing_high, recent_swing_low, IndicatorError};
use crate::params::StrategyParams;
use crate::position::BarInput;
use crate::signals::{last_two_snapshots, RsiBand, SignalSet, SnapshotPair, TrendBias};

/// Which of the two series a check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesRole {
    Trend,
    Trigger,
}

impl std::fmt::Display for SeriesRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SeriesRole::Trend => "trend",
            SeriesRole::Trigger => "trigger",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluateError {
    #[error("insufficient {role} history: have {have} bars, need {need}")]
    InsufficientData {
        role: SeriesRole,
        have: usize,
        need: usize,
    },

    #[error("invalid {role} series: {source}")]
    InvalidBars {
        role: SeriesRole,
        #[source]
        source: BarError,
    },

    #[error("indicator error: {0}")]
    Indicator(#[from] IndicatorError),
}

/// Everything derived from one ticker's bars on this run.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub bar_time: DateTime<Utc>,
    pub price: f64,
    pub trigger: SnapshotPair,
    pub bias: Option<TrendBias>,
    pub signals: SignalSet,
    pub swing_low: f64,
    pub swing_high: f64,
}

impl Evaluation {
    pub fn bar_input<'a>(&self, symbol: &'a str) -> BarInput<'a> {
        BarInput {
            symbol,
            bar_time: self.bar_time,
            price: self.price,
            signals: self.signals,
            swing_low: self.swing_low,
            swing_high: self.swing_high,
        }
    }
}

fn check_series(role: SeriesRole, bars: &[Bar], need: usize) -> Result<(), EvaluateError> {
    if bars.len() < need {
        return Err(EvaluateError::InsufficientData {
            role,
            have: bars.len(),
            need,
        });
    }
    validate_series(bars).map_err(|source| EvaluateError::InvalidBars { role, source })
}

/// Evaluate one ticker.
///
/// `trend` is `None` on a monitor pass; the resulting signal set then carries
/// no entries. Both series must already be canonical (sorted, deduplicated).
pub fn evaluate_series(
    params: &StrategyParams,
    trend: Option<&[Bar]>,
    trigger: &[Bar],
) -> Result<Evaluation, EvaluateError> {
    let bias = match trend {
        Some(bars) => {
            check_series(SeriesRole::Trend, bars, params.required_trend_bars())?;
            let pair = last_two_snapshots(bars, params.trend, None)?.ok_or(
                EvaluateError::InsufficientData {
                    role: SeriesRole::Trend,
                    have: bars.len(),
                    need: params.required_trend_bars(),
                },
            )?;
            Some(TrendBias::from_snapshot(&pair.curr))
        }
        None => None,
    };

    check_series(SeriesRole::Trigger, trigger, params.required_trigger_bars())?;
    let pair = last_two_snapshots(trigger, params.trigger, Some(params.rsi_period))?.ok_or(
        EvaluateError::InsufficientData {
            role: SeriesRole::Trigger,
            have: trigger.len(),
            need: params.required_trigger_bars(),
        },
    )?;

    let signals = SignalSet::evaluate(&pair, bias, RsiBand::from(params));
    let last = &trigger[trigger.len() - 1];

    Ok(Evaluation {
        bar_time: last.timestamp,
        price: last.close,
        trigger: pair,
        bias,
        signals,
        swing_low: recent_swing_low(trigger, params.swing_lookback)?,
        swing_high: recent_swing_high(trigger, params.swing_lookback)?,
    })
}
