use crate::attempt::AttemptTracker;
use crate::error::EngineError;
use crate::filter::{self, FilterVerdict};
use crate::score::{self, MIN_SCORE};
use crate::Result;
use capsched_core::{CapabilityRecord, PlacementRequest};
use capsched_registry::{CapabilityRegistry, RegistryError, ReserveOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn, Instrument};

/// Configuration for the placement engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on every registry call made by the engine
    pub registry_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            registry_timeout: Duration::from_millis(500),
        }
    }
}

/// Placement decision engine
///
/// Invoked synchronously by the scheduling host at the four points of a
/// pod's binding cycle: filter, score, reserve, unreserve (plus commit once
/// the authoritative bind succeeded). The host owns the loop and the node
/// list; the engine owns only the per-call decision, backed by the
/// capability registry.
///
/// Filter and score are pure reads and may run concurrently across nodes
/// and pods. Reserve is a compare-and-commit inside the registry; the engine
/// never decrements blindly.
pub struct DecisionEngine {
    registry: Arc<dyn CapabilityRegistry>,
    config: EngineConfig,
    attempts: AttemptTracker,
    span: tracing::Span,
}

impl DecisionEngine {
    /// Create a new engine against a capability registry
    pub fn new(registry: Arc<dyn CapabilityRegistry>, config: EngineConfig) -> Self {
        let span = tracing::info_span!("placement_engine");
        span.in_scope(|| info!("Placement engine created"));
        Self {
            registry,
            config,
            attempts: AttemptTracker::new(),
            span,
        }
    }

    /// Decide admissibility of the candidate node
    ///
    /// Pure read. Registry failure or timeout is a temporary error, never a
    /// pass and never a permanent reject; the attempt stays unfiled so a
    /// later reserve cannot slip through.
    pub async fn filter(&self, req: &PlacementRequest) -> Result<FilterVerdict> {
        async {
            let verdict = match self.fetch_record(&req.node).await? {
                Some(record) => filter::evaluate(&record, &req.claim),
                None => {
                    FilterVerdict::reject(format!("Node {} has no capability record", req.node))
                }
            };

            self.attempts
                .record_filtered(&req.pod, &req.node, verdict.admitted())
                .await;

            match &verdict {
                FilterVerdict::Admit => debug!("Filter: {} admitted on {}", req.pod, req.node),
                FilterVerdict::Reject { reason } => {
                    debug!("Filter: {} rejected on {}: {}", req.pod, req.node, reason)
                }
            }
            Ok(verdict)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Rank an admissible node by post-placement headroom (0-100)
    pub async fn score(&self, req: &PlacementRequest) -> Result<i64> {
        async {
            let score = match self.fetch_record(&req.node).await? {
                Some(record) => score::headroom_score(&record, &req.claim),
                None => MIN_SCORE,
            };

            self.attempts.record_scored(&req.pod, &req.node).await;
            debug!("Score: {} on {} -> {}", req.pod, req.node, score);
            Ok(score)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Take a capacity hold on the chosen node
    ///
    /// Compare-and-commit against current availability; returns
    /// [`EngineError::Conflict`] when capacity disappeared between score and
    /// reserve. Idempotent for the same (pod, node). Requires a prior
    /// admitting filter.
    pub async fn reserve(&self, req: &PlacementRequest) -> Result<()> {
        async {
            let state = self.attempts.state(&req.pod, &req.node).await;
            if !state.can_reserve() {
                return Err(EngineError::internal_error(format!(
                    "Reserve for {} on {} in state {:?}: filter must admit the node first",
                    req.pod, req.node, state
                )));
            }

            let call = self.registry.try_reserve(&req.pod, &req.node, &req.claim);
            let outcome = match timeout(self.config.registry_timeout, call).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    return Err(EngineError::temporary(
                        format!("Reserve on {} failed: {}", req.node, e),
                        Some(Box::new(e)),
                    ))
                }
                Err(_) => {
                    return Err(EngineError::temporary(
                        format!(
                            "Reserve on {} timed out after {:?}",
                            req.node, self.config.registry_timeout
                        ),
                        None,
                    ))
                }
            };

            match outcome {
                ReserveOutcome::Reserved(reservation) => {
                    info!(
                        "Reserved {} on {} for {} (reservation {})",
                        req.claim, req.node, req.pod, reservation.id
                    );
                    self.attempts.record_reserved(&req.pod, &req.node).await;
                    Ok(())
                }
                ReserveOutcome::AlreadyReserved(reservation) => {
                    debug!(
                        "Duplicate reserve for {} on {}: hold {} already exists",
                        req.pod, req.node, reservation.id
                    );
                    self.attempts.record_reserved(&req.pod, &req.node).await;
                    Ok(())
                }
                ReserveOutcome::Insufficient {
                    class,
                    requested,
                    available,
                } => {
                    warn!(
                        "Conflict: {} lost capacity race on {} (class {}: {} < {})",
                        req.pod, req.node, class, available, requested
                    );
                    self.attempts.finish(&req.pod, &req.node).await;
                    Err(EngineError::conflict(
                        req.pod.clone(),
                        req.node.clone(),
                        class,
                        requested,
                        available,
                    ))
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    /// Release the hold for this (pod, node), best-effort
    ///
    /// Never fails from the host's point of view: a missing hold is a no-op
    /// and registry failures are logged and swallowed (the registry's expiry
    /// sweep reclaims leaked holds).
    pub async fn unreserve(&self, req: &PlacementRequest) {
        async {
            let call = self.registry.release(&req.pod, &req.node);
            match timeout(self.config.registry_timeout, call).await {
                Ok(Ok(Some(reservation))) => {
                    info!(
                        "Released reservation {} for {} on {}",
                        reservation.id, req.pod, req.node
                    );
                }
                Ok(Ok(None)) => {
                    debug!("Unreserve for {} on {}: no matching hold", req.pod, req.node);
                }
                Ok(Err(e)) => {
                    warn!(
                        "Unreserve for {} on {} failed, hold left to the expiry sweep: {}",
                        req.pod, req.node, e
                    );
                }
                Err(_) => {
                    warn!(
                        "Unreserve for {} on {} timed out after {:?}",
                        req.pod, req.node, self.config.registry_timeout
                    );
                }
            }
            // The pod's cycle is over; drop the entries of every candidate
            // node it was filtered against, not just the released one.
            self.attempts.finish_pod(&req.pod).await;
        }
        .instrument(self.span.clone())
        .await
    }

    /// Finalize the hold after the authoritative bind succeeded
    ///
    /// The registry keeps the units deducted and drops the hold record. On a
    /// temporary failure the attempt stays reserved so the host can retry.
    pub async fn commit(&self, req: &PlacementRequest) -> Result<()> {
        async {
            let call = self.registry.commit(&req.pod, &req.node);
            match timeout(self.config.registry_timeout, call).await {
                Ok(Ok(Some(reservation))) => {
                    info!(
                        "Committed reservation {} for {} on {}",
                        reservation.id, req.pod, req.node
                    );
                }
                Ok(Ok(None)) => {
                    warn!("Commit for {} on {}: no hold recorded", req.pod, req.node);
                }
                Ok(Err(e)) => {
                    return Err(EngineError::temporary(
                        format!("Commit on {} failed: {}", req.node, e),
                        Some(Box::new(e)),
                    ))
                }
                Err(_) => {
                    return Err(EngineError::temporary(
                        format!(
                            "Commit on {} timed out after {:?}",
                            req.node, self.config.registry_timeout
                        ),
                        None,
                    ))
                }
            }
            self.attempts.finish_pod(&req.pod).await;
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Drop attempt entries older than `max_age`
    ///
    /// Cycles the host abandons mid-flight (every candidate rejected, pod
    /// deleted before reserve) never reach a terminal call; hosts schedule
    /// this sweep alongside the registry's reservation expiry. Returns how
    /// many entries were dropped.
    pub async fn expire_attempts(&self, max_age: Duration) -> usize {
        async { self.attempts.expire(max_age).await }
            .instrument(self.span.clone())
            .await
    }

    /// Snapshot a node record with the configured timeout
    ///
    /// `None` means the registry has no record for the node; errors are the
    /// temporary taxonomy only.
    async fn fetch_record(&self, node: &str) -> Result<Option<CapabilityRecord>> {
        match timeout(self.config.registry_timeout, self.registry.node_record(node)).await {
            Ok(Ok(record)) => Ok(Some(record)),
            Ok(Err(RegistryError::NodeNotFound { .. })) => Ok(None),
            Ok(Err(e)) => Err(EngineError::temporary(
                format!("Registry lookup for node {} failed: {}", node, e),
                Some(Box::new(e)),
            )),
            Err(_) => Err(EngineError::temporary(
                format!(
                    "Registry lookup for node {} timed out after {:?}",
                    node, self.config.registry_timeout
                ),
                None,
            )),
        }
    }
}
