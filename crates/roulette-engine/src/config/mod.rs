// crates/roulette-engine/src/config/mod.rs
// Configuration and shared constants

pub mod env;
pub mod file;
pub mod session;

pub use env::ApiKeys;
pub use file::RouletteConfig;
pub use session::{EngineConfig, SearchConfig, SessionConfig};
