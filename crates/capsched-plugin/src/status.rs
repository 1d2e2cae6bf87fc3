use capsched_engine::EngineError;
use std::fmt;

/// Status codes in the scheduling framework's taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// The extension point succeeded
    Success,
    /// The node is unsuitable for this attempt; not retried on this node
    Unschedulable,
    /// Temporary or internal failure; the host may retry the attempt
    Error,
}

/// Result of one extension-point call, in the host framework's shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    /// Create a success status
    pub fn success() -> Self {
        Self {
            code: StatusCode::Success,
            message: String::new(),
        }
    }

    /// Create an unschedulable status with a reason
    pub fn unschedulable(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Unschedulable,
            message: message.into(),
        }
    }

    /// Create an error status
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Error,
            message: message.into(),
        }
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        self.code == StatusCode::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            StatusCode::Success => write!(f, "Success"),
            StatusCode::Unschedulable => write!(f, "Unschedulable: {}", self.message),
            StatusCode::Error => write!(f, "Error: {}", self.message),
        }
    }
}

impl From<EngineError> for Status {
    /// Map the engine taxonomy onto framework statuses
    ///
    /// A capacity conflict marks the node unschedulable for this attempt;
    /// temporary and internal failures surface as errors so the host retries
    /// rather than blacklisting the node.
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Conflict { .. } => Status::unschedulable(err.to_string()),
            EngineError::Temporary { .. } | EngineError::Internal { .. } => {
                Status::error(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsched_core::PodKey;

    #[test]
    fn test_success() {
        let status = Status::success();
        assert!(status.is_success());
        assert_eq!(status.to_string(), "Success");
    }

    #[test]
    fn test_conflict_maps_to_unschedulable() {
        let err = EngineError::conflict(PodKey::new("default", "p1"), "node1", "x", 2, 1);
        let status = Status::from(err);
        assert_eq!(status.code, StatusCode::Unschedulable);
        assert!(status.message.contains("node1"));
    }

    #[test]
    fn test_temporary_maps_to_error() {
        let err = EngineError::temporary("registry down", None);
        let status = Status::from(err);
        assert_eq!(status.code, StatusCode::Error);
        assert!(!status.is_success());
    }
}
