//! Alerts emitted by the position state machine.
//!
//! Alerts are data; turning them into message text is the runner's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{Side, Status};

/// Which take-profit threshold was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TakeProfitLevel {
    First,
    Second,
}

impl TakeProfitLevel {
    pub fn number(self) -> u8 {
        match self {
            TakeProfitLevel::First => 1,
            TakeProfitLevel::Second => 2,
        }
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    /// A new position was opened at `price` with its protective stop.
    Entry {
        side: Side,
        price: f64,
        stop_loss: f64,
    },
    /// Price crossed the stop in the losing direction; the position is closed.
    StopLoss {
        side: Side,
        price: f64,
        stop_loss: f64,
    },
    /// Price reached a take-profit target; the position stays open.
    TakeProfit {
        side: Side,
        level: TakeProfitLevel,
        price: f64,
        entry_price: f64,
        target: f64,
    },
    /// The trigger pair crossed against the position; advisory only.
    ExitCandidate { side: Side, price: f64 },
    /// The ticker was forced flat by an operator.
    ManualReset { previous: Status },
}

/// An alert for one ticker at one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub bar_time: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: AlertKind,
}

impl Alert {
    pub fn new(symbol: impl Into<String>, bar_time: DateTime<Utc>, kind: AlertKind) -> Self {
        Self {
            symbol: symbol.into(),
            bar_time,
            kind,
        }
    }

    /// Short machine-friendly label, used in log fields.
    pub fn label(&self) -> &'static str {
        match self.kind {
            AlertKind::Entry { .. } => "entry",
            AlertKind::StopLoss { .. } => "stop_loss",
            AlertKind::TakeProfit {
                level: TakeProfitLevel::First,
                ..
            } => "take_profit_1",
            AlertKind::TakeProfit {
                level: TakeProfitLevel::Second,
                ..
            } => "take_profit_2",
            AlertKind::ExitCandidate { .. } => "exit_candidate",
            AlertKind::ManualReset { .. } => "manual_reset",
        }
    }
}
