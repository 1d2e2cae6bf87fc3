use capsched_core::{CapabilityClaim, CapabilityRecord};
use tracing::debug;

/// Result of filtering a node for a claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Node can satisfy the claim
    Admit,
    /// Node is unsuitable for this attempt
    Reject {
        reason: String,
    },
}

impl FilterVerdict {
    /// Create a rejecting verdict
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }

    /// Whether the node was admitted
    pub fn admitted(&self) -> bool {
        matches!(self, Self::Admit)
    }

    /// Rejection reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Admit => None,
            Self::Reject { reason } => Some(reason),
        }
    }
}

/// Decide admissibility of a claim against a node's capability record
///
/// Pure read: rejects when the node is marked unschedulable or when any
/// claimed class has fewer available units than requested. A class absent
/// from the record counts as zero available units.
pub fn evaluate(record: &CapabilityRecord, claim: &CapabilityClaim) -> FilterVerdict {
    if record.unschedulable {
        return FilterVerdict::reject(format!("Node {} is marked unschedulable", record.node));
    }

    for (class, requested) in claim.iter() {
        let available = record.available_of(class);
        if available < requested {
            debug!(
                "Node {} rejected: class {} has {} units, requested {}",
                record.node, class, available, requested
            );
            return FilterVerdict::reject(format!(
                "Insufficient capability {}: requested {}, available {}",
                class, requested, available
            ));
        }
    }

    FilterVerdict::Admit
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn create_test_record(node: &str, classes: &[(&str, u64)]) -> CapabilityRecord {
        let capacity: BTreeMap<String, u64> = classes
            .iter()
            .map(|(c, u)| (c.to_string(), *u))
            .collect();
        CapabilityRecord::new(node, capacity)
    }

    #[test]
    fn test_admit_when_units_suffice() {
        let record = create_test_record("node1", &[("fast-ssd", 2)]);
        let claim = CapabilityClaim::parse("fast-ssd=1").unwrap();

        assert!(evaluate(&record, &claim).admitted());
    }

    #[test]
    fn test_reject_when_units_insufficient() {
        let record = create_test_record("node1", &[("fast-ssd", 1)]);
        let claim = CapabilityClaim::parse("fast-ssd=2").unwrap();

        let verdict = evaluate(&record, &claim);
        assert!(!verdict.admitted());
        assert!(verdict.reason().unwrap().contains("fast-ssd"));
    }

    #[test]
    fn test_reject_when_class_missing() {
        let record = create_test_record("node1", &[("hdd", 8)]);
        let claim = CapabilityClaim::parse("fast-ssd=1").unwrap();

        let verdict = evaluate(&record, &claim);
        assert!(!verdict.admitted());
        assert!(verdict.reason().unwrap().contains("available 0"));
    }

    #[test]
    fn test_reject_unschedulable_node() {
        let mut record = create_test_record("node1", &[("fast-ssd", 4)]);
        record.unschedulable = true;
        let claim = CapabilityClaim::parse("fast-ssd=1").unwrap();

        let verdict = evaluate(&record, &claim);
        assert!(!verdict.admitted());
        assert!(verdict.reason().unwrap().contains("unschedulable"));
    }

    #[test]
    fn test_empty_claim_admits() {
        let record = create_test_record("node1", &[]);
        let claim = CapabilityClaim::new();

        assert!(evaluate(&record, &claim).admitted());
    }
}
