//! Signal rules: decide entry and exit booleans from indicator snapshots.
//!
//! Rules never see position state. The position state machine combines their
//! output with the stored state to decide transitions and alerts.

pub mod rules;
pub mod snapshot;

pub use rules::{
    crossed_down, crossed_up, entry_signal, exit_cross_signal, RsiBand, SignalSet, TrendBias,
};
pub use snapshot::{last_two_snapshots, IndicatorSnapshot, SnapshotPair};
