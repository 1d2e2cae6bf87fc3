use crate::Result;
use async_trait::async_trait;
use capsched_core::{CapabilityClaim, CapabilityRecord, PodKey, Reservation};

/// Outcome of a conditional reserve
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// Units were decremented and a new hold recorded
    Reserved(Reservation),
    /// This (pod, node) pair already holds a reservation; nothing was decremented
    AlreadyReserved(Reservation),
    /// At least one claimed class lacked units; nothing was decremented
    Insufficient {
        class: String,
        requested: u64,
        available: u64,
    },
}

/// Capability registry contract
///
/// The registry owns all durable capacity state: per-node capability records
/// and outstanding reservations. The placement engine reads records during
/// Filter/Score and requests conditional mutations during Reserve/Unreserve.
///
/// Implementations must make `try_reserve` a compare-and-commit: the
/// availability check and the decrement happen under the same per-node
/// critical section, and a duplicate reserve for the same (pod, node) returns
/// the existing hold without a second decrement.
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    // --- Read path ---

    /// Snapshot the capability record for a node
    async fn node_record(&self, node: &str) -> Result<CapabilityRecord>;

    // --- Mutation path ---

    /// Conditionally decrement available units and record a hold
    async fn try_reserve(
        &self,
        pod: &PodKey,
        node: &str,
        claim: &CapabilityClaim,
    ) -> Result<ReserveOutcome>;

    /// Restore the units of the matching hold and drop it
    ///
    /// Returns `None` when no hold exists for the (pod, node) pair.
    async fn release(&self, pod: &PodKey, node: &str) -> Result<Option<Reservation>>;

    /// Drop the matching hold while keeping its units deducted
    ///
    /// Called after the authoritative bind succeeded; the capacity now
    /// belongs to the running pod. Returns `None` when no hold exists.
    async fn commit(&self, pod: &PodKey, node: &str) -> Result<Option<Reservation>>;
}
