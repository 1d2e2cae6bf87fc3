use capsched_core::{CapabilityClaim, CapabilityRecord};
use tracing::debug;

/// Lowest possible node score
pub const MIN_SCORE: i64 = 0;

/// Highest possible node score
pub const MAX_SCORE: i64 = 100;

/// Spare units at which a class reaches half score
const HALF_SCORE_UNITS: f64 = 8.0;

/// Score a node by its post-placement headroom (0-100, higher is better)
///
/// Headroom is the absolute spare units left after placement,
/// `available - requested`. Each claimed class maps its headroom `h`
/// through the saturating curve `h / (h + 8)`; the score is the mean across
/// claimed classes scaled to 0-100. The curve is strictly increasing in
/// spare units, so for any two admissible nodes more headroom never scores
/// lower, regardless of how large either node is.
///
/// A pod with an empty claim is scored by overall availability across every
/// class the node offers; a node offering no classes at all gets the neutral
/// midpoint.
pub fn headroom_score(record: &CapabilityRecord, claim: &CapabilityClaim) -> i64 {
    let fractions: Vec<f64> = if claim.is_empty() {
        if record.capacity.is_empty() {
            return MAX_SCORE / 2;
        }
        record
            .capacity
            .keys()
            .map(|class| unit_score(record.available_of(class), 0))
            .collect()
    } else {
        claim
            .iter()
            .map(|(class, requested)| unit_score(record.available_of(class), requested))
            .collect()
    };

    let mean = fractions.iter().sum::<f64>() / fractions.len() as f64;
    let score = (mean * MAX_SCORE as f64).round() as i64;
    let score = score.clamp(MIN_SCORE, MAX_SCORE);

    debug!("Node {} headroom score: {}", record.node, score);
    score
}

fn unit_score(available: u64, requested: u64) -> f64 {
    let headroom = available.saturating_sub(requested) as f64;
    headroom / (headroom + HALF_SCORE_UNITS)
}

/// Pick the winning node from scored candidates
///
/// Highest score wins; ties break by lexicographically smallest node name so
/// the choice is deterministic across runs.
pub fn pick_winner(scores: &[(String, i64)]) -> Option<(String, i64)> {
    scores
        .iter()
        .max_by(|(name_a, score_a), (name_b, score_b)| {
            score_a.cmp(score_b).then_with(|| name_b.cmp(name_a))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn create_test_record(node: &str, classes: &[(&str, u64, u64)]) -> CapabilityRecord {
        let mut record = CapabilityRecord::new(
            node,
            classes
                .iter()
                .map(|(c, cap, _)| (c.to_string(), *cap))
                .collect::<BTreeMap<_, _>>(),
        );
        record.available = classes
            .iter()
            .map(|(c, _, avail)| (c.to_string(), *avail))
            .collect();
        record
    }

    #[test]
    fn test_more_headroom_scores_higher() {
        let claim = CapabilityClaim::parse("x=1").unwrap();
        let roomy = create_test_record("node1", &[("x", 8, 8)]);
        let tight = create_test_record("node2", &[("x", 8, 2)]);

        assert!(headroom_score(&roomy, &claim) > headroom_score(&tight, &claim));
    }

    #[test]
    fn test_monotonic_in_available_units() {
        let claim = CapabilityClaim::parse("x=1").unwrap();
        let mut previous = MIN_SCORE;

        for available in 1..=8 {
            let record = create_test_record("node1", &[("x", 8, available)]);
            let score = headroom_score(&record, &claim);
            assert!(score >= previous, "score dropped at available={}", available);
            previous = score;
        }
    }

    #[test]
    fn test_headroom_ordering_across_node_sizes() {
        // A big node with more spare units must not lose to a small node
        // that is merely emptier in relative terms.
        let claim = CapabilityClaim::parse("x=1").unwrap();
        let big = create_test_record("node1", &[("x", 100, 10)]);
        let small = create_test_record("node2", &[("x", 4, 4)]);

        assert!(headroom_score(&big, &claim) >= headroom_score(&small, &claim));

        // Exhaustively: any pair where A's availability >= B's orders the
        // scores the same way, whatever the capacities.
        for (avail_a, cap_a) in [(10u64, 100u64), (4, 4), (2, 50), (7, 8)] {
            for (avail_b, cap_b) in [(10u64, 10u64), (3, 4), (1, 200), (6, 6)] {
                if avail_a < avail_b {
                    continue;
                }
                let a = create_test_record("a", &[("x", cap_a, avail_a)]);
                let b = create_test_record("b", &[("x", cap_b, avail_b)]);
                assert!(
                    headroom_score(&a, &claim) >= headroom_score(&b, &claim),
                    "headroom {} >= {} but scores ordered the other way",
                    avail_a,
                    avail_b
                );
            }
        }
    }

    #[test]
    fn test_no_units_scores_zero() {
        let claim = CapabilityClaim::parse("x=1").unwrap();
        let record = create_test_record("node1", &[("x", 0, 0)]);

        assert_eq!(headroom_score(&record, &claim), MIN_SCORE);
    }

    #[test]
    fn test_score_stays_in_range() {
        let claim = CapabilityClaim::parse("x=8").unwrap();
        let huge = create_test_record("node1", &[("x", 10_000, 10_000)]);
        let empty = create_test_record("node2", &[("x", 8, 0)]);

        assert!(headroom_score(&huge, &claim) <= MAX_SCORE);
        assert_eq!(headroom_score(&empty, &claim), MIN_SCORE);
    }

    #[test]
    fn test_empty_claim_scores_overall_availability() {
        let claim = CapabilityClaim::new();
        let idle = create_test_record("node1", &[("x", 4, 4), ("y", 4, 4)]);
        let busy = create_test_record("node2", &[("x", 4, 1), ("y", 4, 0)]);
        let bare = create_test_record("node3", &[]);

        assert!(headroom_score(&idle, &claim) > headroom_score(&busy, &claim));
        assert_eq!(headroom_score(&bare, &claim), MAX_SCORE / 2);
    }

    #[test]
    fn test_pick_winner_highest_score() {
        let scores = vec![
            ("node1".to_string(), 40),
            ("node2".to_string(), 80),
            ("node3".to_string(), 60),
        ];

        let (winner, score) = pick_winner(&scores).unwrap();
        assert_eq!(winner, "node2");
        assert_eq!(score, 80);
    }

    #[test]
    fn test_pick_winner_ties_break_by_name() {
        let scores = vec![
            ("node-b".to_string(), 70),
            ("node-a".to_string(), 70),
            ("node-c".to_string(), 70),
        ];

        let (winner, _) = pick_winner(&scores).unwrap();
        assert_eq!(winner, "node-a");
    }

    #[test]
    fn test_pick_winner_empty() {
        assert!(pick_winner(&[]).is_none());
    }
}
