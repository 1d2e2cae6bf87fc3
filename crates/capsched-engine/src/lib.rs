//! Capsched Engine - Placement decision logic
//!
//! This crate provides:
//! - The four placement decisions (filter, score, reserve, unreserve)
//! - Claim admissibility checks and headroom scoring
//! - Per-attempt state tracking across the binding cycle
//! - Bounded-timeout access to the capability registry

pub mod attempt;
pub mod engine;
pub mod error;
pub mod filter;
pub mod score;

// Re-export commonly used types
pub use attempt::AttemptState;
pub use engine::{DecisionEngine, EngineConfig};
pub use error::{EngineError, Result};
pub use filter::FilterVerdict;
pub use score::{pick_winner, MAX_SCORE, MIN_SCORE};
