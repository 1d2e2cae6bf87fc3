// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for capsched operations
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    /// Claim could not be parsed or is malformed
    #[error("Invalid capability claim: {reason}")]
    #[diagnostic(
        code(capsched::invalid_claim),
        help("Claims are comma-separated `class=units` pairs with positive integer units")
    )]
    InvalidClaim {
        reason: String,
    },

    /// Quantity could not be parsed as a whole unit count
    #[error("Invalid capability quantity {value:?}: {reason}")]
    #[diagnostic(
        code(capsched::invalid_quantity),
        help("Capability units are whole non-negative integers, without suffixes")
    )]
    InvalidQuantity {
        value: String,
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(capsched::serialization_error),
        help("Ensure the data is valid JSON or YAML")
    )]
    SerializationError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an InvalidClaim error
    pub fn invalid_claim(reason: impl Into<String>) -> Self {
        Self::InvalidClaim {
            reason: reason.into(),
        }
    }

    /// Create an InvalidQuantity error
    pub fn invalid_quantity(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidQuantity {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}
