//! The streaming turn pipeline.

pub mod executor;
pub mod inflight;
pub mod speak;

pub use executor::{TurnExecutor, TurnOptions, TurnOutcome, TurnRequest, TurnStatus};
pub use inflight::{InflightRegistry, TurnGuard};
