//! Domain types for SwingWatch

pub mod alert;
pub mod bar;
pub mod state;

pub use alert::{Alert, AlertKind, TakeProfitLevel};
pub use bar::{canonicalize, closes, validate_series, Bar, BarError};
pub use state::{OpenPosition, Position, Side, Status, TickerState};
