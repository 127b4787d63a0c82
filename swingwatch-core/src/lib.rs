//! SwingWatch Core: domain types, indicators, signal rules, position state machine.
//!
//! This crate contains the evaluation engine:
//! - Domain types (bars, per-ticker state, alerts)
//! - Indicator library (SMA, Wilder RSI, swing high/low)
//! - Signal rules over the last two indicator snapshots
//! - Position state machine, the only producer of new ticker state
//! - Per-ticker evaluation from bar series to state machine input
//! - Strategy parameters
//! - Bar sources behind the `DataProvider` trait

pub mod data;
pub mod domain;
pub mod evaluate;
pub mod indicators;
pub mod params;
pub mod position;
pub mod signals;

pub use evaluate::{evaluate_series, EvaluateError, Evaluation, SeriesRole};
pub use params::{MaPair, ParamsError, StrategyParams};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types shared with the driver are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::TickerState>();
        require_sync::<domain::TickerState>();
        require_send::<domain::Alert>();
        require_sync::<domain::Alert>();

        // Engine types
        require_send::<params::StrategyParams>();
        require_sync::<params::StrategyParams>();
        require_send::<position::PositionMachine>();
        require_sync::<position::PositionMachine>();
        require_send::<signals::SignalSet>();
        require_sync::<signals::SignalSet>();

        // Providers
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::StaticProvider>();
        require_sync::<data::StaticProvider>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
    }

    /// Architecture contract: signal rules never see position state.
    ///
    /// `SignalSet::evaluate` takes a snapshot pair, an optional trend bias and
    /// the RSI band. If a `TickerState` parameter is ever added, this breaks.
    #[test]
    fn signal_rules_take_no_position_state() {
        fn _check(
            pair: &signals::SnapshotPair,
            bias: Option<signals::TrendBias>,
            band: signals::RsiBand,
        ) -> signals::SignalSet {
            signals::SignalSet::evaluate(pair, bias, band)
        }
    }
}
