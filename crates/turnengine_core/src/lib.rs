//! `turnengine_core` — deterministic turn simulation for a 4X space
//! strategy engine.
//!
//! No IO, no network. All randomness flows through a passed-in `Rng`, and
//! every mutating step is a plain function over `GameState` so the whole
//! pipeline stays testable without a server running.

pub mod battle;
pub mod bombing;
pub mod commands;
pub mod economy;
pub mod error;
pub mod id;
pub mod movement;
pub mod orchestrator;
pub mod scanning;
pub mod types;

#[cfg(feature = "test-support")]
pub mod test_fixtures;

pub use error::{EngineError, EngineResult};
pub use orchestrator::tick;
pub use types::*;
