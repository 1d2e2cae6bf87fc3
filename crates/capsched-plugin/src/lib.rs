//! Capsched Plugin - Host adapter for the placement engine
//!
//! This crate provides:
//! - Extension-point traits mirroring the scheduling host's plugin contract
//! - `CapacityPlugin`, one struct satisfying all four lifecycle points
//! - Framework-style status codes
//! - Conversion from pod specs to placement requests

pub mod convert;
pub mod error;
pub mod plugin;
pub mod status;

// Re-export commonly used types
pub use error::{PluginError, Result};
pub use plugin::{
    CapacityPlugin, FilterExtension, PluginArgs, PostBindExtension, ReserveExtension,
    ScoreExtension,
};
pub use status::{Status, StatusCode};
