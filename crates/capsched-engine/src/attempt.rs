use capsched_core::PodKey;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// State of one (pod, node) placement attempt
///
/// The full cycle is
/// `Unfiled -> Filtered -> Scored -> Reserved -> {Committed | Unreserved}`.
/// `Committed` and `Unreserved` are terminal: the tracker drops every entry
/// for the pod, so finished attempts read as `Unfiled` again. Reserve never
/// runs without an admitting Filter first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// No decision recorded yet
    Unfiled,
    /// Filter ran; `admitted` carries the verdict
    Filtered {
        admitted: bool,
    },
    /// Node was scored after an admitting filter
    Scored,
    /// A capacity hold exists for this pair
    Reserved,
}

impl AttemptState {
    /// Whether Reserve is allowed from this state
    pub fn can_reserve(&self) -> bool {
        matches!(self, Self::Filtered { admitted: true } | Self::Scored)
    }
}

#[derive(Debug, Clone, Copy)]
struct Attempt {
    state: AttemptState,
    updated_at: Instant,
}

impl Attempt {
    fn new(state: AttemptState) -> Self {
        Self {
            state,
            updated_at: Instant::now(),
        }
    }
}

/// Tracks in-flight placement attempts per (pod, node) pair
///
/// A pod's scheduling cycle files one entry per candidate node, but only the
/// chosen node sees unreserve or commit. Terminal transitions therefore purge
/// every entry for the pod, and [`expire`](Self::expire) sweeps entries for
/// cycles the host abandoned (e.g. all candidates rejected, pod never
/// retried).
#[derive(Default)]
pub struct AttemptTracker {
    attempts: Mutex<HashMap<(PodKey, String), Attempt>>,
}

impl AttemptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of an attempt
    pub async fn state(&self, pod: &PodKey, node: &str) -> AttemptState {
        self.attempts
            .lock()
            .await
            .get(&(pod.clone(), node.to_string()))
            .map(|a| a.state)
            .unwrap_or(AttemptState::Unfiled)
    }

    /// Record a filter verdict, restarting the attempt for this pair
    pub async fn record_filtered(&self, pod: &PodKey, node: &str, admitted: bool) {
        self.attempts.lock().await.insert(
            (pod.clone(), node.to_string()),
            Attempt::new(AttemptState::Filtered { admitted }),
        );
    }

    /// Advance an admitted attempt to Scored
    ///
    /// A score arriving for a pair the filter never admitted is ignored;
    /// Reserve will still fail the contract check.
    pub async fn record_scored(&self, pod: &PodKey, node: &str) {
        let mut attempts = self.attempts.lock().await;
        let key = (pod.clone(), node.to_string());
        match attempts.get(&key).map(|a| a.state) {
            Some(AttemptState::Filtered { admitted: true }) | Some(AttemptState::Scored) => {
                attempts.insert(key, Attempt::new(AttemptState::Scored));
            }
            other => {
                debug!(
                    "Attempt {}/{}: score recorded in state {:?}, not advancing",
                    pod, node, other
                );
            }
        }
    }

    /// Mark the pair as holding a reservation
    pub async fn record_reserved(&self, pod: &PodKey, node: &str) {
        self.attempts.lock().await.insert(
            (pod.clone(), node.to_string()),
            Attempt::new(AttemptState::Reserved),
        );
    }

    /// End the attempt for one pair (lost to a conflict)
    ///
    /// Returns the state the attempt was in, if any.
    pub async fn finish(&self, pod: &PodKey, node: &str) -> Option<AttemptState> {
        self.attempts
            .lock()
            .await
            .remove(&(pod.clone(), node.to_string()))
            .map(|a| a.state)
    }

    /// End the pod's whole cycle (committed or unreserved)
    ///
    /// Drops the entries of every candidate node the pod was filtered
    /// against, not just the chosen one. Returns how many were dropped.
    pub async fn finish_pod(&self, pod: &PodKey) -> usize {
        let mut attempts = self.attempts.lock().await;
        let before = attempts.len();
        attempts.retain(|(p, _), _| p != pod);
        let removed = before - attempts.len();
        if removed > 0 {
            debug!("Attempts for {} cleared ({} entries)", pod, removed);
        }
        removed
    }

    /// Drop every entry older than `max_age`
    ///
    /// Sweep for cycles the host abandoned without a terminal call. Returns
    /// how many entries were dropped.
    pub async fn expire(&self, max_age: Duration) -> usize {
        let mut attempts = self.attempts.lock().await;
        let before = attempts.len();
        attempts.retain(|_, a| a.updated_at.elapsed() <= max_age);
        let removed = before - attempts.len();
        if removed > 0 {
            debug!("Expired {} stale attempt entries", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attempt_lifecycle() {
        let tracker = AttemptTracker::new();
        let pod = PodKey::new("default", "p1");

        assert_eq!(tracker.state(&pod, "node1").await, AttemptState::Unfiled);

        tracker.record_filtered(&pod, "node1", true).await;
        assert_eq!(
            tracker.state(&pod, "node1").await,
            AttemptState::Filtered { admitted: true }
        );
        assert!(tracker.state(&pod, "node1").await.can_reserve());

        tracker.record_scored(&pod, "node1").await;
        assert_eq!(tracker.state(&pod, "node1").await, AttemptState::Scored);

        tracker.record_reserved(&pod, "node1").await;
        assert_eq!(tracker.state(&pod, "node1").await, AttemptState::Reserved);

        let last = tracker.finish(&pod, "node1").await;
        assert_eq!(last, Some(AttemptState::Reserved));
        assert_eq!(tracker.state(&pod, "node1").await, AttemptState::Unfiled);
    }

    #[tokio::test]
    async fn test_rejected_filter_blocks_reserve() {
        let tracker = AttemptTracker::new();
        let pod = PodKey::new("default", "p1");

        tracker.record_filtered(&pod, "node1", false).await;
        assert!(!tracker.state(&pod, "node1").await.can_reserve());
    }

    #[tokio::test]
    async fn test_score_without_filter_does_not_advance() {
        let tracker = AttemptTracker::new();
        let pod = PodKey::new("default", "p1");

        tracker.record_scored(&pod, "node1").await;
        assert_eq!(tracker.state(&pod, "node1").await, AttemptState::Unfiled);
        assert!(!tracker.state(&pod, "node1").await.can_reserve());
    }

    #[tokio::test]
    async fn test_attempts_are_per_pair() {
        let tracker = AttemptTracker::new();
        let pod = PodKey::new("default", "p1");

        tracker.record_filtered(&pod, "node1", true).await;
        assert_eq!(tracker.state(&pod, "node2").await, AttemptState::Unfiled);
    }

    #[tokio::test]
    async fn test_finish_pod_clears_every_candidate() {
        let tracker = AttemptTracker::new();
        let pod = PodKey::new("default", "p1");
        let other = PodKey::new("default", "p2");

        // One cycle touches several nodes; only node1 wins.
        tracker.record_filtered(&pod, "node1", true).await;
        tracker.record_filtered(&pod, "node2", true).await;
        tracker.record_filtered(&pod, "node3", false).await;
        tracker.record_reserved(&pod, "node1").await;
        tracker.record_filtered(&other, "node1", true).await;

        assert_eq!(tracker.finish_pod(&pod).await, 3);

        assert_eq!(tracker.state(&pod, "node1").await, AttemptState::Unfiled);
        assert_eq!(tracker.state(&pod, "node2").await, AttemptState::Unfiled);
        assert_eq!(tracker.state(&pod, "node3").await, AttemptState::Unfiled);
        // Other pods' cycles are untouched.
        assert_eq!(
            tracker.state(&other, "node1").await,
            AttemptState::Filtered { admitted: true }
        );
    }

    #[tokio::test]
    async fn test_expire_drops_stale_entries() {
        let tracker = AttemptTracker::new();
        let pod = PodKey::new("default", "p1");

        tracker.record_filtered(&pod, "node1", false).await;

        // Young entries survive a generous sweep.
        assert_eq!(tracker.expire(Duration::from_secs(60)).await, 0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(tracker.expire(Duration::from_millis(1)).await, 1);
        assert_eq!(tracker.state(&pod, "node1").await, AttemptState::Unfiled);
    }
}
