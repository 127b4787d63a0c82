//! Position state machine: sole mutator of per-ticker state.

pub mod machine;

pub use machine::{BarInput, PositionMachine, Transition};
