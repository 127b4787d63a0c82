//! Bar sources

pub mod circuit_breaker;
pub mod csv;
pub mod provider;
pub mod yahoo;

pub use self::csv::CsvProvider;
pub use circuit_breaker::CircuitBreaker;
pub use provider::{DataError, DataProvider, StaticProvider, Timeframe};
pub use yahoo::YahooProvider;
