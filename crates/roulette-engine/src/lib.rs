// crates/roulette-engine/src/lib.rs
// Roulette - restaurant candidate engine

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod animation;
pub mod availability;
pub mod clock;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod geo;
pub mod history;
pub mod input;
pub mod inventory;
pub mod kept;
pub mod search;
pub mod single_flight;

#[cfg(test)]
pub mod test_support;


pub use engine::{EngineView, SpinEngine, SpinOutcome, StepOutcome};
pub use error::{EngineError, Result};
