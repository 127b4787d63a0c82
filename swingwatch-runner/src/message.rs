//! Alert text.
//!
//! One message per alert: a bracketed headline with the display name and
//! symbol, the bar time in the configured zone, then the kind-specific lines.
//! Prices are shown with two decimals.

use chrono_tz::Tz;
use swingwatch_core::domain::{Alert, AlertKind, Side, TakeProfitLevel};
use swingwatch_core::StrategyParams;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Percentage for display: `0.03` → `3`, `0.025` → `2.5`.
fn pct(fraction: f64) -> String {
    let s = format!("{:.2}", fraction * 100.0);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn side_word(side: Side) -> &'static str {
    match side {
        Side::Long => "Long",
        Side::Short => "Short",
    }
}

/// Render `alert` for a ticker displayed as `name`.
pub fn render(alert: &Alert, name: &str, tz: Tz, params: &StrategyParams) -> String {
    let when = alert.bar_time.with_timezone(&tz).format(TIME_FORMAT);
    let head = |title: &str| format!("[{title}] {name} ({})\nTime: {when}", alert.symbol);
    let trigger = params.trigger;

    match &alert.kind {
        AlertKind::Entry {
            side,
            price,
            stop_loss,
        } => {
            let t1 = params.take_profit_target(*side, *price, TakeProfitLevel::First);
            let t2 = params.take_profit_target(*side, *price, TakeProfitLevel::Second);
            let (title, setup, anchor, sign) = match side {
                Side::Long => (
                    "BUY SIGNAL",
                    format!(
                        "golden cross {}/{} + close above {}MA + RSI rebound",
                        trigger.short, trigger.long, trigger.long
                    ),
                    "swing low",
                    "+",
                ),
                Side::Short => (
                    "SELL SIGNAL",
                    format!(
                        "death cross {}/{} + close below {}MA + RSI rollover",
                        trigger.short, trigger.long, trigger.long
                    ),
                    "swing high",
                    "-",
                ),
            };
            let buffer_sign = if *side == Side::Long { "-" } else { "+" };
            format!(
                "{}\nSetup: {setup}\nEntry ref: {price:.2}\nStop: {stop_loss:.2} ({anchor} {buffer_sign}{}%)\n\
                 Targets: {t1:.2} ({sign}{}%) / {t2:.2} ({sign}{}%)",
                head(title),
                pct(params.sl_buffer),
                pct(params.tp1),
                pct(params.tp2),
            )
        }
        AlertKind::StopLoss {
            side,
            price,
            stop_loss,
        } => {
            let (verb, cmp) = match side {
                Side::Long => ("fell below", "<="),
                Side::Short => ("rose above", ">="),
            };
            format!(
                "{}\n{} stop {verb}\nPrice: {price:.2} {cmp} SL: {stop_loss:.2}",
                head("STOP LOSS"),
                side_word(*side),
            )
        }
        AlertKind::TakeProfit {
            side,
            level,
            price,
            entry_price,
            target,
        } => {
            let (sign, fraction) = match (side, level) {
                (Side::Long, TakeProfitLevel::First) => ("+", params.tp1),
                (Side::Long, TakeProfitLevel::Second) => ("+", params.tp2),
                (Side::Short, TakeProfitLevel::First) => ("-", params.tp1),
                (Side::Short, TakeProfitLevel::Second) => ("-", params.tp2),
            };
            format!(
                "{}\n{} {sign}{}% reached (TP{} {target:.2})\nNow: {price:.2} / Entry: {entry_price:.2}",
                head("TAKE PROFIT"),
                side_word(*side),
                pct(fraction),
                level.number(),
            )
        }
        AlertKind::ExitCandidate { side, price } => {
            let cross = match side {
                Side::Long => {
                    format!("dead cross again: {}MA below {}MA", trigger.short, trigger.long)
                }
                Side::Short => {
                    format!("golden cross again: {}MA above {}MA", trigger.short, trigger.long)
                }
            };
            format!(
                "{}\n{} position, consider closing\nShort-term {cross}\nPrice: {price:.2}",
                head("EXIT CANDIDATE"),
                side_word(*side),
            )
        }
        AlertKind::ManualReset { previous } => {
            format!("{}\nState {previous} cleared by request, now FLAT", head("MANUAL RESET"))
        }
    }
}
