use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// PodKey uniquely identifies the pod being scheduled
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodKey {
    /// Namespace of the pod
    pub namespace: String,
    /// Pod name
    pub name: String,
}

impl PodKey {
    /// Create a new PodKey
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Capability units requested by a pod, keyed by capability class
///
/// Classes are opaque names (e.g. `fast-ssd`, `hdd`); units are whole counts.
/// An empty claim is legal and means the pod needs no managed capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityClaim {
    units: BTreeMap<String, u64>,
}

impl CapabilityClaim {
    /// Create an empty claim
    pub fn new() -> Self {
        Self::default()
    }

    /// Add units for a capability class, accumulating with existing units
    pub fn add(&mut self, class: impl Into<String>, units: u64) {
        if units > 0 {
            *self.units.entry(class.into()).or_insert(0) += units;
        }
    }

    /// Units requested for a class (0 when absent)
    pub fn get(&self, class: &str) -> u64 {
        self.units.get(class).copied().unwrap_or(0)
    }

    /// Whether no units are requested at all
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterate over (class, units) pairs in class order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.units.iter().map(|(c, u)| (c.as_str(), *u))
    }

    /// Number of distinct classes claimed
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Merge another claim into this one, accumulating units per class
    pub fn merge(&mut self, other: &CapabilityClaim) {
        for (class, units) in other.iter() {
            self.add(class, units);
        }
    }

    /// Parse a claim from a `class=units,class=units` list
    ///
    /// Whitespace around entries is ignored; an empty string is an empty claim.
    pub fn parse(s: &str) -> Result<Self> {
        let mut claim = Self::new();

        for entry in s.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let (class, units) = entry.split_once('=').ok_or_else(|| {
                CoreError::invalid_claim(format!("entry {:?} is not `class=units`", entry))
            })?;

            let class = class.trim();
            if class.is_empty() {
                return Err(CoreError::invalid_claim(format!(
                    "entry {:?} has an empty class name",
                    entry
                )));
            }

            let units: u64 = units.trim().parse().map_err(|e| {
                CoreError::invalid_quantity(units.trim(), format!("not a whole count: {}", e))
            })?;

            claim.add(class, units);
        }

        Ok(claim)
    }

    /// Consume the claim, yielding its unit map
    pub fn into_units(self) -> BTreeMap<String, u64> {
        self.units
    }
}

impl fmt::Display for CapabilityClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (class, units) in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}={}", class, units)?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<(String, u64)> for CapabilityClaim {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut claim = Self::new();
        for (class, units) in iter {
            claim.add(class, units);
        }
        claim
    }
}

/// A single placement question: can/should this pod land on this node?
///
/// Immutable per call; the scheduling host constructs one per (pod, node)
/// invocation of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    /// Identity of the pod being scheduled
    pub pod: PodKey,
    /// Candidate node name
    pub node: String,
    /// Capability units the pod declared
    pub claim: CapabilityClaim,
}

impl PlacementRequest {
    /// Create a new PlacementRequest
    pub fn new(pod: PodKey, node: impl Into<String>, claim: CapabilityClaim) -> Self {
        Self {
            pod,
            node: node.into(),
            claim,
        }
    }
}

/// Per-node capability inventory as reported by the registry
///
/// `capacity` is the total provisioned units per class; `available` is what
/// remains after subtracting reservations and committed holds. The registry
/// owns this record; the engine only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRecord {
    /// Node name
    pub node: String,
    /// Total units per capability class
    pub capacity: BTreeMap<String, u64>,
    /// Units not held by any reservation or commit
    pub available: BTreeMap<String, u64>,
    /// Whether the registry marked the node unschedulable
    pub unschedulable: bool,
}

impl CapabilityRecord {
    /// Create a record with identical capacity and availability
    pub fn new(node: impl Into<String>, capacity: BTreeMap<String, u64>) -> Self {
        Self {
            node: node.into(),
            available: capacity.clone(),
            capacity,
            unschedulable: false,
        }
    }

    /// Available units for a class (0 when the class is absent)
    pub fn available_of(&self, class: &str) -> u64 {
        self.available.get(class).copied().unwrap_or(0)
    }

    /// Total units for a class (0 when the class is absent)
    pub fn capacity_of(&self, class: &str) -> u64 {
        self.capacity.get(class).copied().unwrap_or(0)
    }
}

/// A transient hold on node capacity pending the authoritative bind
///
/// Created by Reserve, released by Unreserve or an external expiry sweep,
/// finalized by Commit. Never a substitute for the final bind itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation id
    pub id: Uuid,
    /// Pod holding the reservation
    pub pod: PodKey,
    /// Node the units are held on
    pub node: String,
    /// Units held per capability class
    pub units: BTreeMap<String, u64>,
    /// When the hold was created
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Create a new reservation with a fresh id, timestamped now
    pub fn new(pod: PodKey, node: impl Into<String>, units: BTreeMap<String, u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pod,
            node: node.into(),
            units,
            created_at: Utc::now(),
        }
    }

    /// Age of the reservation relative to now
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}
