// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Plugin adapter error type
#[derive(Error, Debug, Diagnostic)]
pub enum PluginError {
    /// Pod is missing identity fields the adapter needs
    #[error("Invalid pod: {reason}")]
    #[diagnostic(
        code(plugin::invalid_pod),
        help("Pods reaching the scheduler must carry metadata.name and metadata.namespace")
    )]
    InvalidPod {
        reason: String,
    },

    /// Claim declared on the pod could not be parsed
    #[error("Claim error: {0}")]
    #[diagnostic(
        code(plugin::claim_error),
        help("Check the pod's capability resource requests and claims annotation")
    )]
    ClaimError(#[from] capsched_core::CoreError),
}

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;

impl PluginError {
    /// Create an InvalidPod error
    pub fn invalid_pod(reason: impl Into<String>) -> Self {
        Self::InvalidPod {
            reason: reason.into(),
        }
    }
}
