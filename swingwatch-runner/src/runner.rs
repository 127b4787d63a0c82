//! Watchlist runner: wires together bar source, evaluation, state machine,
//! state store and alert sink.
//!
//! One run:
//! 1. Load the state book; apply pending manual resets, save, and remove the
//!    applied keys from the reset inbox.
//! 2. For each watched ticker (monitor mode: open positions only), fetch bars,
//!    evaluate, step the state machine, deliver alerts, save the book.
//!
//! A failing ticker is logged and skipped with its state untouched; nothing
//! below configuration aborts the run. Once the bar source reports itself
//! unavailable, the remaining tickers fail without a request.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use swingwatch_core::data::{
    CircuitBreaker, CsvProvider, DataError, DataProvider, Timeframe, YahooProvider,
};
use swingwatch_core::domain::{canonicalize, Alert, BarError, TickerState};
use swingwatch_core::indicators::IndicatorError;
use swingwatch_core::position::{PositionMachine, Transition};
use swingwatch_core::{evaluate_series, EvaluateError, SeriesRole};

use crate::config::{AppConfig, ConfigError, ProviderKind};
use crate::message::render;
use crate::reset::ResetInbox;
use crate::sink::AlertSink;
use crate::store::{StateBook, StateStore, StoreError};

/// Which pass this run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Entry scan: trend and trigger series, every watched ticker.
    #[default]
    Scan,
    /// Exit monitor: trigger series only, open positions only, never enters.
    Monitor,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Scan => "scan",
            RunMode::Monitor => "monitor",
        })
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(RunMode::Scan),
            "monitor" => Ok(RunMode::Monitor),
            other => Err(format!("unknown run mode '{other}' (expected scan or monitor)")),
        }
    }
}

/// Why one ticker was skipped.
#[derive(Debug, Error)]
pub enum TickerError {
    #[error("insufficient {timeframe} history: have {have} bars, need {need}")]
    InsufficientData {
        timeframe: Timeframe,
        have: usize,
        need: usize,
    },

    #[error("bar source: {0}")]
    DataSource(#[from] DataError),

    #[error("invalid bars: {0}")]
    InvalidBars(#[from] BarError),

    #[error("indicator: {0}")]
    Indicator(#[from] IndicatorError),
}

/// Errors that stop a run before any ticker is evaluated.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("state store: {0}")]
    Store(#[from] StoreError),
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub evaluated: usize,
    /// Not enough history yet.
    pub skipped: usize,
    /// Bar source or series errors.
    pub failed: usize,
    pub alerts: usize,
    pub delivery_failures: usize,
    pub save_failures: usize,
    pub resets: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "evaluated={} skipped={} failed={} alerts={} delivery_failures={} save_failures={} resets={}",
            self.evaluated,
            self.skipped,
            self.failed,
            self.alerts,
            self.delivery_failures,
            self.save_failures,
            self.resets
        )
    }
}

/// Build the configured bar source.
pub fn provider_from_config(config: &AppConfig) -> Result<Box<dyn DataProvider>, DataError> {
    match config.data.provider {
        ProviderKind::Yahoo => {
            let breaker = Arc::new(CircuitBreaker::default_provider());
            let timeout = Duration::from_secs(config.data.timeout_secs);
            let provider = YahooProvider::new(breaker, timeout)?;
            Ok(Box::new(provider))
        }
        ProviderKind::Csv => Ok(Box::new(CsvProvider::new(&config.data.csv_dir))),
    }
}

/// Runs the watchlist once against injected collaborators.
pub struct Runner<'a> {
    config: &'a AppConfig,
    provider: &'a dyn DataProvider,
    sink: &'a dyn AlertSink,
    store: &'a dyn StateStore,
    resets: Option<&'a ResetInbox>,
    machine: PositionMachine,
    tz: Tz,
    clock: fn() -> DateTime<Utc>,
}

impl<'a> Runner<'a> {
    pub fn new(
        config: &'a AppConfig,
        provider: &'a dyn DataProvider,
        sink: &'a dyn AlertSink,
        store: &'a dyn StateStore,
    ) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            config,
            provider,
            sink,
            store,
            resets: None,
            machine: PositionMachine::new(config.strategy.clone()),
            tz: config.timezone()?,
            clock: Utc::now,
        })
    }

    /// Consume manual reset requests from `inbox` at the start of each run.
    pub fn with_reset_inbox(mut self, inbox: &'a ResetInbox) -> Self {
        self.resets = Some(inbox);
        self
    }

    /// Override the wall clock used to stamp manual resets.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn run(&self, mode: RunMode) -> Result<RunSummary, RunError> {
        info!(
            %mode,
            tickers = self.config.watchlist.len(),
            provider = self.provider.name(),
            sink = self.sink.name(),
            "run started"
        );
        let mut book = self.store.load()?;
        let mut summary = RunSummary::default();

        self.apply_resets(&mut book, &mut summary);

        let throttle = Duration::from_millis(self.config.run.throttle_ms);
        let mut fetched_any = false;
        let mut source_down = false;
        for entry in &self.config.watchlist {
            let symbol = entry.symbol.as_str();
            let state = book.get(symbol).cloned().unwrap_or_else(TickerState::flat);

            if mode == RunMode::Monitor && state.is_flat() {
                debug!(symbol = %symbol, "flat, not monitored");
                continue;
            }

            if source_down || !self.provider.is_available() {
                if !source_down {
                    warn!(
                        provider = self.provider.name(),
                        "bar source unavailable, skipping remaining tickers"
                    );
                    source_down = true;
                }
                summary.failed += 1;
                continue;
            }

            if fetched_any && !throttle.is_zero() {
                std::thread::sleep(throttle);
            }
            fetched_any = true;

            let transition = match self.evaluate_ticker(symbol, &state, mode) {
                Ok(t) => t,
                Err(TickerError::InsufficientData {
                    timeframe,
                    have,
                    need,
                }) => {
                    info!(
                        symbol = %symbol,
                        %timeframe,
                        have,
                        need,
                        "insufficient history, skipped"
                    );
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "ticker failed, state preserved");
                    summary.failed += 1;
                    continue;
                }
            };
            summary.evaluated += 1;

            self.deliver_all(&transition.alerts, &mut summary);

            let changed = book.get(symbol) != Some(&transition.state);
            if changed {
                debug!(symbol = %symbol, status = %transition.state.status(), "state updated");
                book.insert(symbol.to_string(), transition.state);
                self.save(&book, &mut summary);
            }
        }

        info!(%mode, %summary, "run complete");
        Ok(summary)
    }

    /// Force every requested symbol flat.
    ///
    /// The applied keys leave the inbox only after the book is saved, so a
    /// failed save retries the reset on the next run.
    fn apply_resets(&self, book: &mut StateBook, summary: &mut RunSummary) {
        let Some(inbox) = self.resets else {
            return;
        };
        let pending = match inbox.pending() {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %inbox.path().display(), error = %e, "could not read reset inbox");
                return;
            }
        };
        if pending.is_empty() {
            return;
        }

        let at = (self.clock)();
        for symbol in &pending {
            let state = book.get(symbol).cloned().unwrap_or_else(TickerState::flat);
            let previous = state.status();
            let Transition { state, alerts } = self.machine.manual_reset(&state, symbol, at);
            info!(symbol = %symbol, %previous, "manual reset");
            book.insert(symbol.clone(), state);
            self.deliver_all(&alerts, summary);
            summary.resets += 1;
        }
        if !self.save(book, summary) {
            return;
        }
        if let Err(e) = inbox.consume(&pending) {
            error!(
                path = %inbox.path().display(),
                error = %e,
                "could not remove applied resets from inbox"
            );
        }
    }

    fn evaluate_ticker(
        &self,
        symbol: &str,
        state: &TickerState,
        mode: RunMode,
    ) -> Result<Transition, TickerError> {
        let data = &self.config.data;
        // An open position is only checked against trigger bars.
        let trend = if mode == RunMode::Scan && state.is_flat() {
            let bars = self.provider.fetch(symbol, data.trend_timeframe, &data.trend_range)?;
            Some(canonicalize(bars))
        } else {
            None
        };
        let bars = self.provider.fetch(symbol, data.trigger_timeframe, &data.trigger_range)?;
        let trigger = canonicalize(bars);

        let evaluation = evaluate_series(&self.config.strategy, trend.as_deref(), &trigger)
            .map_err(|e| self.ticker_error(e))?;
        debug!(
            symbol = %symbol,
            price = evaluation.price,
            bar_time = %evaluation.bar_time,
            signals = ?evaluation.signals,
            "evaluated"
        );
        Ok(self.machine.next(state, &evaluation.bar_input(symbol)))
    }

    fn ticker_error(&self, e: EvaluateError) -> TickerError {
        let timeframe = |role: SeriesRole| match role {
            SeriesRole::Trend => self.config.data.trend_timeframe,
            SeriesRole::Trigger => self.config.data.trigger_timeframe,
        };
        match e {
            EvaluateError::InsufficientData { role, have, need } => TickerError::InsufficientData {
                timeframe: timeframe(role),
                have,
                need,
            },
            EvaluateError::InvalidBars { source, .. } => TickerError::InvalidBars(source),
            EvaluateError::Indicator(e) => TickerError::Indicator(e),
        }
    }

    fn deliver_all(&self, alerts: &[Alert], summary: &mut RunSummary) {
        for alert in alerts {
            let name = self.config.display_name(&alert.symbol);
            let text = render(alert, name, self.tz, &self.config.strategy);
            info!(
                symbol = %alert.symbol,
                kind = alert.label(),
                bar_time = %alert.bar_time,
                "alert"
            );
            summary.alerts += 1;
            if let Err(e) = self.sink.deliver(&text) {
                warn!(
                    symbol = %alert.symbol,
                    sink = self.sink.name(),
                    error = %e,
                    "alert delivery failed"
                );
                summary.delivery_failures += 1;
            }
        }
    }

    /// True when the book reached the store.
    fn save(&self, book: &StateBook, summary: &mut RunSummary) -> bool {
        match self.store.save(book) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "could not save state");
                summary.save_failures += 1;
                false
            }
        }
    }
}
