//! Position state machine.
//!
//! The only code that produces a new `TickerState`. Given the stored state and
//! the current bar's price, rule outcomes and swing levels, `next` returns the
//! successor state and the alerts the transition emits.
//!
//! Transition table:
//!
//! | from  | condition                         | to    | alert          |
//! |-------|-----------------------------------|-------|----------------|
//! | FLAT  | long entry, bar not yet signalled | LONG  | Entry(long)    |
//! | FLAT  | short entry, bar not yet signalled| SHORT | Entry(short)   |
//! | LONG  | price <= stop                     | FLAT  | StopLoss       |
//! | LONG  | price >= entry*(1+tpN), flag unset| LONG  | TakeProfit(N)  |
//! | LONG  | exit cross, bar not yet signalled | LONG  | ExitCandidate  |
//! | SHORT | mirror of LONG                    |       |                |
//! | any   | manual reset                      | FLAT  | ManualReset    |
//!
//! Open-position checks are evaluated independently against the position as it
//! stood at the start of the call, so several alerts may come out of one bar.
//! Only the stop changes status. An opposite entry signal while open is
//! ignored: a position must pass through FLAT before the next entry.

use chrono::{DateTime, Utc};

use crate::domain::{
    Alert, AlertKind, OpenPosition, Position, Side, TakeProfitLevel, TickerState,
};
use crate::params::StrategyParams;
use crate::signals::SignalSet;

/// Everything the machine needs to know about the current bar.
#[derive(Debug, Clone, Copy)]
pub struct BarInput<'a> {
    pub symbol: &'a str,
    pub bar_time: DateTime<Utc>,
    /// Latest trigger-timeframe close.
    pub price: f64,
    pub signals: SignalSet,
    /// Lowest low over the swing lookback, anchors a long stop.
    pub swing_low: f64,
    /// Highest high over the swing lookback, anchors a short stop.
    pub swing_high: f64,
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: TickerState,
    pub alerts: Vec<Alert>,
}

impl Transition {
    fn unchanged(state: &TickerState) -> Self {
        Self {
            state: state.clone(),
            alerts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionMachine {
    params: StrategyParams,
}

impl PositionMachine {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Advance `state` by one evaluation of `input`.
    pub fn next(&self, state: &TickerState, input: &BarInput<'_>) -> Transition {
        match state.position.as_open() {
            None => self.on_flat(state, input),
            Some((side, open)) => self.on_open(state, side, open, input),
        }
    }

    /// Force a ticker flat regardless of its current status.
    ///
    /// Keeps `last_signal_bar` so a reset cannot re-open on a bar that already
    /// produced an alert.
    pub fn manual_reset(&self, state: &TickerState, symbol: &str, at: DateTime<Utc>) -> Transition {
        Transition {
            state: TickerState {
                position: Position::Flat,
                last_signal_bar: state.last_signal_bar,
            },
            alerts: vec![Alert::new(
                symbol,
                at,
                AlertKind::ManualReset {
                    previous: state.status(),
                },
            )],
        }
    }

    fn stop_for(&self, side: Side, input: &BarInput<'_>) -> f64 {
        match side {
            Side::Long => input.swing_low * (1.0 - self.params.sl_buffer),
            Side::Short => input.swing_high * (1.0 + self.params.sl_buffer),
        }
    }

    fn on_flat(&self, state: &TickerState, input: &BarInput<'_>) -> Transition {
        if state.signalled_on(input.bar_time) {
            return Transition::unchanged(state);
        }

        let Some(side) = [Side::Long, Side::Short]
            .into_iter()
            .find(|&side| input.signals.entry(side))
        else {
            return Transition::unchanged(state);
        };

        let stop_loss = self.stop_for(side, input);
        Transition {
            state: TickerState {
                position: Position::open(
                    side,
                    OpenPosition::new(input.price, input.bar_time, stop_loss),
                ),
                last_signal_bar: Some(input.bar_time),
            },
            alerts: vec![Alert::new(
                input.symbol,
                input.bar_time,
                AlertKind::Entry {
                    side,
                    price: input.price,
                    stop_loss,
                },
            )],
        }
    }

    fn on_open(
        &self,
        state: &TickerState,
        side: Side,
        open: &OpenPosition,
        input: &BarInput<'_>,
    ) -> Transition {
        let same_bar = state.signalled_on(input.bar_time);
        let price = input.price;
        let mut alerts = Vec::new();
        let mut next = open.clone();
        let mut last_signal_bar = state.last_signal_bar;

        // (a) stop-loss breach
        let stopped = match side {
            Side::Long => price <= open.stop_loss,
            Side::Short => price >= open.stop_loss,
        };
        if stopped {
            last_signal_bar = Some(input.bar_time);
            alerts.push(Alert::new(
                input.symbol,
                input.bar_time,
                AlertKind::StopLoss {
                    side,
                    price,
                    stop_loss: open.stop_loss,
                },
            ));
        }

        // (b), (c) take-profit thresholds, each at most once per position
        for level in [TakeProfitLevel::First, TakeProfitLevel::Second] {
            let target = self.params.take_profit_target(side, open.entry_price, level);
            let reached = match side {
                Side::Long => price >= target,
                Side::Short => price <= target,
            };
            let sent = match level {
                TakeProfitLevel::First => &mut next.tp1_sent,
                TakeProfitLevel::Second => &mut next.tp2_sent,
            };
            if reached && !*sent {
                *sent = true;
                alerts.push(Alert::new(
                    input.symbol,
                    input.bar_time,
                    AlertKind::TakeProfit {
                        side,
                        level,
                        price,
                        entry_price: open.entry_price,
                        target,
                    },
                ));
            }
        }

        // (d) trigger cross against the position
        if input.signals.exit(side) && !same_bar {
            last_signal_bar = Some(input.bar_time);
            alerts.push(Alert::new(
                input.symbol,
                input.bar_time,
                AlertKind::ExitCandidate { side, price },
            ));
        }

        let position = if stopped {
            Position::Flat
        } else {
            Position::open(side, next)
        };

        Transition {
            state: TickerState {
                position,
                last_signal_bar,
            },
            alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Status;
    use chrono::{Duration, TimeZone};

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap() + Duration::minutes(30 * i)
    }

    fn machine() -> PositionMachine {
        PositionMachine::new(StrategyParams::default())
    }

    fn input(bar: i64, price: f64, signals: SignalSet) -> BarInput<'static> {
        BarInput {
            symbol: "7203.T",
            bar_time: t(bar),
            price,
            signals,
            swing_low: 95.0,
            swing_high: 110.0,
        }
    }

    fn long_entry() -> SignalSet {
        SignalSet {
            long_entry: true,
            ..SignalSet::default()
        }
    }

    fn long_state(entry: f64, stop: f64) -> TickerState {
        TickerState {
            position: Position::Long(OpenPosition::new(entry, t(0), stop)),
            last_signal_bar: Some(t(0)),
        }
    }

    #[test]
    fn flat_without_signal_is_unchanged() {
        let st = TickerState::flat();
        let tr = machine().next(&st, &input(1, 100.0, SignalSet::default()));
        assert_eq!(tr.state, st);
        assert!(tr.alerts.is_empty());
    }

    #[test]
    fn flat_long_entry_sets_stop_below_swing_low() {
        let tr = machine().next(&TickerState::flat(), &input(1, 100.0, long_entry()));
        assert_eq!(tr.state.status(), Status::Long);
        assert_eq!(tr.state.entry_price(), Some(100.0));
        let stop = tr.state.stop_loss().unwrap();
        assert!((stop - 95.0 * 0.999).abs() < 1e-9);
        assert_eq!(tr.state.last_signal_bar, Some(t(1)));
        assert_eq!(tr.alerts.len(), 1);
        assert!(matches!(
            tr.alerts[0].kind,
            AlertKind::Entry {
                side: Side::Long,
                ..
            }
        ));
    }

    #[test]
    fn flat_short_entry_sets_stop_above_swing_high() {
        let signals = SignalSet {
            short_entry: true,
            ..SignalSet::default()
        };
        let tr = machine().next(&TickerState::flat(), &input(1, 100.0, signals));
        assert_eq!(tr.state.status(), Status::Short);
        assert!((tr.state.stop_loss().unwrap() - 110.0 * 1.001).abs() < 1e-9);
    }

    #[test]
    fn entry_suppressed_on_already_signalled_bar() {
        let st = TickerState {
            position: Position::Flat,
            last_signal_bar: Some(t(1)),
        };
        let tr = machine().next(&st, &input(1, 100.0, long_entry()));
        assert_eq!(tr.state, st);
        assert!(tr.alerts.is_empty());

        // next bar is fair game
        let tr = machine().next(&st, &input(2, 100.0, long_entry()));
        assert_eq!(tr.state.status(), Status::Long);
    }

    #[test]
    fn stop_loss_closes_long() {
        let tr = machine().next(&long_state(100.0, 97.0), &input(3, 96.5, SignalSet::default()));
        assert_eq!(tr.state.status(), Status::Flat);
        assert!(tr.state.entry_price().is_none());
        assert_eq!(tr.state.last_signal_bar, Some(t(3)));
        assert_eq!(tr.alerts.len(), 1);
        assert_eq!(tr.alerts[0].label(), "stop_loss");
    }

    #[test]
    fn stop_loss_on_exact_level() {
        let tr = machine().next(&long_state(100.0, 97.0), &input(3, 97.0, SignalSet::default()));
        assert_eq!(tr.state.status(), Status::Flat);
    }

    #[test]
    fn short_stop_loss_is_mirrored() {
        let st = TickerState {
            position: Position::Short(OpenPosition::new(100.0, t(0), 103.0)),
            last_signal_bar: Some(t(0)),
        };
        let hold = machine().next(&st, &input(2, 102.9, SignalSet::default()));
        assert_eq!(hold.state.status(), Status::Short);
        let hit = machine().next(&st, &input(2, 103.0, SignalSet::default()));
        assert_eq!(hit.state.status(), Status::Flat);
        assert_eq!(hit.alerts[0].label(), "stop_loss");
    }

    #[test]
    fn gap_through_both_take_profits_fires_both_once() {
        let mut params = StrategyParams::default();
        params.tp2 = 0.06;
        let m = PositionMachine::new(params);
        let st = TickerState {
            position: Position::Long(OpenPosition::new(1000.0, t(0), 970.0)),
            last_signal_bar: Some(t(0)),
        };
        let tr = m.next(&st, &input(5, 1065.0, SignalSet::default()));
        let labels: Vec<_> = tr.alerts.iter().map(|a| a.label()).collect();
        assert_eq!(labels, vec!["take_profit_1", "take_profit_2"]);
        let (side, pos) = tr.state.position.as_open().unwrap();
        assert_eq!(side, Side::Long);
        assert!(pos.tp1_sent && pos.tp2_sent);
        assert_eq!(pos.stop_loss, 970.0);

        // a later, higher bar emits nothing more
        let again = m.next(&tr.state, &input(6, 1100.0, SignalSet::default()));
        assert!(again.alerts.is_empty());
        assert_eq!(again.state, tr.state);
    }

    #[test]
    fn take_profit_one_only_below_second_target() {
        let tr = machine().next(&long_state(100.0, 97.0), &input(4, 103.5, SignalSet::default()));
        let (_, pos) = tr.state.position.as_open().unwrap();
        assert!(pos.tp1_sent);
        assert!(!pos.tp2_sent);
        assert_eq!(tr.alerts.len(), 1);
    }

    #[test]
    fn short_take_profit_is_mirrored() {
        let st = TickerState {
            position: Position::Short(OpenPosition::new(100.0, t(0), 103.0)),
            last_signal_bar: Some(t(0)),
        };
        let tr = machine().next(&st, &input(4, 96.9, SignalSet::default()));
        assert_eq!(tr.alerts.len(), 1);
        assert_eq!(tr.alerts[0].label(), "take_profit_1");
    }

    #[test]
    fn exit_cross_is_advisory() {
        let signals = SignalSet {
            exit_long: true,
            ..SignalSet::default()
        };
        let tr = machine().next(&long_state(100.0, 97.0), &input(4, 99.0, signals));
        assert_eq!(tr.state.status(), Status::Long);
        assert_eq!(tr.state.last_signal_bar, Some(t(4)));
        assert_eq!(tr.alerts.len(), 1);
        assert_eq!(tr.alerts[0].label(), "exit_candidate");

        // re-run on the same bar: suppressed, state identical
        let again = machine().next(&tr.state, &input(4, 99.0, signals));
        assert!(again.alerts.is_empty());
        assert_eq!(again.state, tr.state);
    }

    #[test]
    fn opposite_entry_does_not_flip() {
        let signals = SignalSet {
            short_entry: true,
            ..SignalSet::default()
        };
        let st = long_state(100.0, 97.0);
        let tr = machine().next(&st, &input(4, 99.0, signals));
        assert_eq!(tr.state, st);
        assert!(tr.alerts.is_empty());
    }

    #[test]
    fn stop_and_exit_cross_can_fire_together() {
        let signals = SignalSet {
            exit_long: true,
            ..SignalSet::default()
        };
        let tr = machine().next(&long_state(100.0, 97.0), &input(4, 96.0, signals));
        let labels: Vec<_> = tr.alerts.iter().map(|a| a.label()).collect();
        assert_eq!(labels, vec!["stop_loss", "exit_candidate"]);
        assert_eq!(tr.state.status(), Status::Flat);
    }

    #[test]
    fn stopped_bar_blocks_immediate_reentry_on_rerun() {
        let m = machine();
        let stopped = m.next(&long_state(100.0, 97.0), &input(4, 96.0, long_entry()));
        assert_eq!(stopped.state.status(), Status::Flat);
        let rerun = m.next(&stopped.state, &input(4, 96.0, long_entry()));
        assert!(rerun.alerts.is_empty());
        assert_eq!(rerun.state, stopped.state);
    }

    #[test]
    fn manual_reset_from_any_status() {
        let m = machine();
        for st in [
            TickerState::flat(),
            long_state(100.0, 97.0),
            TickerState {
                position: Position::Short(OpenPosition::new(100.0, t(0), 103.0)),
                last_signal_bar: None,
            },
        ] {
            let tr = m.manual_reset(&st, "6503.T", t(9));
            assert_eq!(tr.state.status(), Status::Flat);
            assert_eq!(tr.state.last_signal_bar, st.last_signal_bar);
            assert_eq!(
                tr.alerts[0].kind,
                AlertKind::ManualReset {
                    previous: st.status()
                }
            );
        }
    }
}
