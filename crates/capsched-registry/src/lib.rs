//! Capsched Registry - Capability registry contract and reference backend
//!
//! This crate provides:
//! - The `CapabilityRegistry` trait the placement engine calls against
//! - Conditional reserve/release/commit semantics for capacity holds
//! - An in-memory registry with per-node locking for tests and
//!   single-process deployments

pub mod error;
pub mod memory;
pub mod registry;

// Re-export commonly used types
pub use error::{RegistryError, Result};
pub use memory::MemoryRegistry;
pub use registry::{CapabilityRegistry, ReserveOutcome};
