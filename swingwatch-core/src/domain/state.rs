//! Per-ticker persisted state.
//!
//! The open-position fields only exist inside the `Long`/`Short` variants, so a
//! flat ticker cannot carry an entry price or a stop, and an open one always has
//! both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a synthetic position or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// Flat/long/short summary of a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Flat,
    Long,
    Short,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Flat => write!(f, "FLAT"),
            Status::Long => write!(f, "LONG"),
            Status::Short => write!(f, "SHORT"),
        }
    }
}

impl From<Side> for Status {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => Status::Long,
            Side::Short => Status::Short,
        }
    }
}

/// Entry details of an open position.
///
/// `stop_loss` is fixed at entry and never recomputed. The take-profit flags only
/// ever go from false to true while the position stays open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub stop_loss: f64,
    #[serde(default)]
    pub tp1_sent: bool,
    #[serde(default)]
    pub tp2_sent: bool,
}

impl OpenPosition {
    pub fn new(entry_price: f64, entry_time: DateTime<Utc>, stop_loss: f64) -> Self {
        Self {
            entry_price,
            entry_time,
            stop_loss,
            tp1_sent: false,
            tp2_sent: false,
        }
    }
}

/// Position held by a ticker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Position {
    #[default]
    Flat,
    Long(OpenPosition),
    Short(OpenPosition),
}

impl Position {
    pub fn open(side: Side, position: OpenPosition) -> Self {
        match side {
            Side::Long => Position::Long(position),
            Side::Short => Position::Short(position),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Position::Flat => Status::Flat,
            Position::Long(_) => Status::Long,
            Position::Short(_) => Status::Short,
        }
    }

    /// Side and entry details, or `None` when flat.
    pub fn as_open(&self) -> Option<(Side, &OpenPosition)> {
        match self {
            Position::Flat => None,
            Position::Long(p) => Some((Side::Long, p)),
            Position::Short(p) => Some((Side::Short, p)),
        }
    }
}

/// Persisted state of one ticker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickerState {
    #[serde(default)]
    pub position: Position,
    /// Timestamp of the last bar that produced an entry, exit-candidate or
    /// stop-loss transition. Survives a return to flat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_signal_bar: Option<DateTime<Utc>>,
}

impl TickerState {
    /// Initial state for a ticker with no stored record.
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.position.status()
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.position, Position::Flat)
    }

    pub fn is_open(&self) -> bool {
        !self.is_flat()
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.position.as_open().map(|(_, p)| p.entry_price)
    }

    pub fn stop_loss(&self) -> Option<f64> {
        self.position.as_open().map(|(_, p)| p.stop_loss)
    }

    /// True if `bar_time` already produced a signal-bearing transition.
    pub fn signalled_on(&self, bar_time: DateTime<Utc>) -> bool {
        self.last_signal_bar == Some(bar_time)
    }
}
