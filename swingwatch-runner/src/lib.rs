//! SwingWatch Runner: the watchlist evaluation driver and its collaborators.
//!
//! This crate builds on `swingwatch-core` to provide:
//! - `AppConfig` loaded from TOML
//! - The per-run driver (`Runner`) in scan and monitor modes
//! - JSON state store with atomic writes
//! - Manual reset inbox
//! - Alert text rendering and delivery sinks
//! - Logging setup

pub mod config;
pub mod logging;
pub mod message;
pub mod reset;
pub mod runner;
pub mod sink;
pub mod store;

pub use config::{AppConfig, ConfigError, ProviderKind, WatchEntry};
pub use logging::{init_logging, LogFormat};
pub use reset::ResetInbox;
pub use runner::{provider_from_config, RunError, RunMode, RunSummary, Runner, TickerError};
pub use sink::{
    sink_from_config, AlertSink, DeliveryError, LineBroadcastSink, LogSink, RecordingSink,
};
pub use store::{JsonFileStore, MemoryStore, StateBook, StateStore, StoreError};
