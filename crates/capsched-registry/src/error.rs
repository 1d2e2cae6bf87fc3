// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Registry error type
#[derive(Error, Debug, Diagnostic)]
pub enum RegistryError {
    /// Node has no capability record
    #[error("Node not found in registry: {node}")]
    #[diagnostic(
        code(registry::node_not_found),
        help("Verify the node name and that its capability record was published")
    )]
    NodeNotFound {
        node: String,
    },

    /// Registry backend failed or is unreachable
    #[error("Registry unavailable: {message}")]
    #[diagnostic(
        code(registry::unavailable),
        help("Check the registry backend; the engine treats this as a temporary failure")
    )]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl RegistryError {
    /// Create a NodeNotFound error
    pub fn node_not_found(node: impl Into<String>) -> Self {
        Self::NodeNotFound { node: node.into() }
    }

    /// Create an Unavailable error
    pub fn unavailable(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Unavailable {
            message: message.into(),
            source,
        }
    }
}
