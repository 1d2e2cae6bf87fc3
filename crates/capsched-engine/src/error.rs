// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use capsched_core::PodKey;
use miette::Diagnostic;
use thiserror::Error;

/// Engine error type
///
/// Genuine node unsuitability is not an error; filter returns it as a
/// [`FilterVerdict::Reject`](crate::FilterVerdict) value. Errors cover the
/// retriable and contract-violation paths only.
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    /// Registry unreachable or timed out; the host may retry elsewhere
    #[error("Temporary registry failure: {message}")]
    #[diagnostic(
        code(engine::temporary),
        help("Retry on another attempt; do not blacklist the node for this failure")
    )]
    Temporary {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Lost the race for capacity between Score and Reserve
    #[error(
        "Capacity conflict for {pod} on {node}: class {class} has {available} units, requested {requested}"
    )]
    #[diagnostic(
        code(engine::conflict),
        help("Treat the node as filtered out for this attempt and re-score the others")
    )]
    Conflict {
        pod: PodKey,
        node: String,
        class: String,
        requested: u64,
        available: u64,
    },

    /// Host broke the call contract (e.g. Reserve before Filter)
    #[error("Internal error: {message}")]
    #[diagnostic(
        code(engine::internal_error),
        help("This indicates a host integration bug. Please report it")
    )]
    Internal {
        message: String,
    },
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Create a Temporary error
    pub fn temporary(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Temporary {
            message: message.into(),
            source,
        }
    }

    /// Create a Conflict error
    pub fn conflict(
        pod: PodKey,
        node: impl Into<String>,
        class: impl Into<String>,
        requested: u64,
        available: u64,
    ) -> Self {
        Self::Conflict {
            pod,
            node: node.into(),
            class: class.into(),
            requested,
            available,
        }
    }

    /// Create an Internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the host may retry after this error
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary { .. })
    }
}
