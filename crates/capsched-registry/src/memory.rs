use crate::error::RegistryError;
use crate::registry::{CapabilityRegistry, ReserveOutcome};
use crate::Result;
use async_trait::async_trait;
use capsched_core::{CapabilityClaim, CapabilityRecord, PodKey, Reservation};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Per-node state: the capability record plus outstanding holds
#[derive(Debug, Default)]
struct NodeEntry {
    record: CapabilityRecord,
    reservations: HashMap<PodKey, Reservation>,
}

impl NodeEntry {
    /// Restore a hold's units into the record, capped at capacity
    ///
    /// The cap matters only when an operator shrank capacity while the hold
    /// was outstanding.
    fn restore(&mut self, reservation: &Reservation) {
        for (class, units) in &reservation.units {
            let capacity = self.record.capacity_of(class);
            let available = self.record.available.entry(class.clone()).or_insert(0);
            *available = (*available + units).min(capacity);
        }
    }
}

/// In-memory capability registry
///
/// Reference implementation for tests and single-process deployments. Each
/// node's state sits behind its own async mutex, so reserve's
/// check-then-decrement is a per-node critical section while reads and
/// operations on other nodes proceed concurrently.
#[derive(Default)]
pub struct MemoryRegistry {
    nodes: RwLock<HashMap<String, Arc<Mutex<NodeEntry>>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish or replace a node's capability record
    ///
    /// Outstanding reservations on the node are kept.
    pub async fn upsert_node(&self, record: CapabilityRecord) {
        let node = record.node.clone();
        let entry = {
            let mut nodes = self.nodes.write().await;
            nodes
                .entry(node.clone())
                .or_insert_with(|| Arc::new(Mutex::new(NodeEntry::default())))
                .clone()
        };
        entry.lock().await.record = record;
        debug!("Registry: node record published: {}", node);
    }

    /// Mark a node schedulable or unschedulable
    pub async fn set_unschedulable(&self, node: &str, unschedulable: bool) -> Result<()> {
        let entry = self.entry(node).await?;
        entry.lock().await.record.unschedulable = unschedulable;
        debug!("Registry: node {} unschedulable={}", node, unschedulable);
        Ok(())
    }

    /// Remove a node and all its reservations
    pub async fn remove_node(&self, node: &str) {
        self.nodes.write().await.remove(node);
        debug!("Registry: node removed: {}", node);
    }

    /// Release every reservation older than `max_age`, restoring its units
    ///
    /// This is the external-timeout sweep for holds whose host never called
    /// Unreserve or Commit (e.g. a crashed scheduling cycle). Returns the
    /// reservations that were released.
    pub async fn expire_reservations(&self, max_age: chrono::Duration) -> Vec<Reservation> {
        let entries: Vec<Arc<Mutex<NodeEntry>>> =
            self.nodes.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for entry in entries {
            let mut entry = entry.lock().await;
            let stale: Vec<PodKey> = entry
                .reservations
                .iter()
                .filter(|(_, r)| r.age() > max_age)
                .map(|(k, _)| k.clone())
                .collect();

            for pod in stale {
                if let Some(reservation) = entry.reservations.remove(&pod) {
                    entry.restore(&reservation);
                    debug!(
                        "Registry: expired reservation {} for {} on {}",
                        reservation.id, reservation.pod, reservation.node
                    );
                    expired.push(reservation);
                }
            }
        }
        expired
    }

    async fn entry(&self, node: &str) -> Result<Arc<Mutex<NodeEntry>>> {
        self.nodes
            .read()
            .await
            .get(node)
            .cloned()
            .ok_or_else(|| RegistryError::node_not_found(node))
    }
}

#[async_trait]
impl CapabilityRegistry for MemoryRegistry {
    async fn node_record(&self, node: &str) -> Result<CapabilityRecord> {
        let entry = self.entry(node).await?;
        let entry = entry.lock().await;
        Ok(entry.record.clone())
    }

    async fn try_reserve(
        &self,
        pod: &PodKey,
        node: &str,
        claim: &CapabilityClaim,
    ) -> Result<ReserveOutcome> {
        let entry = self.entry(node).await?;
        let mut entry = entry.lock().await;

        // Duplicate reserve for the same pair returns the existing hold.
        if let Some(existing) = entry.reservations.get(pod) {
            debug!(
                "Registry: {} already holds reservation {} on {}",
                pod, existing.id, node
            );
            return Ok(ReserveOutcome::AlreadyReserved(existing.clone()));
        }

        // Check every class before touching any counter.
        for (class, requested) in claim.iter() {
            let available = entry.record.available_of(class);
            if available < requested {
                return Ok(ReserveOutcome::Insufficient {
                    class: class.to_string(),
                    requested,
                    available,
                });
            }
        }

        for (class, requested) in claim.iter() {
            if let Some(available) = entry.record.available.get_mut(class) {
                *available -= requested;
            }
        }

        let reservation = Reservation::new(pod.clone(), node, claim.clone().into_units());
        entry.reservations.insert(pod.clone(), reservation.clone());
        debug!(
            "Registry: reserved {} on {} for {} ({})",
            reservation.id, node, pod, claim
        );

        Ok(ReserveOutcome::Reserved(reservation))
    }

    async fn release(&self, pod: &PodKey, node: &str) -> Result<Option<Reservation>> {
        let entry = match self.entry(node).await {
            Ok(entry) => entry,
            // Unknown node behaves like a missing hold.
            Err(RegistryError::NodeNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut entry = entry.lock().await;

        let Some(reservation) = entry.reservations.remove(pod) else {
            return Ok(None);
        };

        entry.restore(&reservation);
        debug!(
            "Registry: released reservation {} for {} on {}",
            reservation.id, pod, node
        );
        Ok(Some(reservation))
    }

    async fn commit(&self, pod: &PodKey, node: &str) -> Result<Option<Reservation>> {
        let entry = match self.entry(node).await {
            Ok(entry) => entry,
            Err(RegistryError::NodeNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut entry = entry.lock().await;

        let reservation = entry.reservations.remove(pod);
        if let Some(r) = &reservation {
            debug!("Registry: committed reservation {} for {} on {}", r.id, pod, node);
        }
        Ok(reservation)
    }
}
