//! Capsched Core - Fundamental types for the capacity-aware placement engine
//!
//! This crate provides:
//! - Pod and node identity types
//! - Capability claims, records, and reservations
//! - Error types with miette diagnostics
//! - Serialization helpers

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{CapabilityClaim, CapabilityRecord, PlacementRequest, PodKey, Reservation};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::Pod;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Serialize a value to JSON
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a value from JSON
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Serialize a value to YAML
pub fn to_yaml<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to serialize to YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a value from YAML
pub fn from_yaml<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_yaml::from_str(data).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to deserialize from YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let key = PodKey::new("default", "nginx");

        let json = to_json(&key).unwrap();
        assert!(json.contains("nginx"));

        let deserialized: PodKey = from_json(&json).unwrap();
        assert_eq!(deserialized, key);
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut claim = CapabilityClaim::new();
        claim.add("fast-ssd", 2);

        let yaml = to_yaml(&claim).unwrap();
        assert!(yaml.contains("fast-ssd"));

        let deserialized: CapabilityClaim = from_yaml(&yaml).unwrap();
        assert_eq!(deserialized, claim);
    }
}
