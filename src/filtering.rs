//! Relevance floor applied to ranked hits.

use tracing::debug;

use crate::types::RankedHit;

/// Retains hits whose `final_score` meets `threshold` (inclusive).
///
/// The threshold is signed — pairwise relevance models routinely score below
/// zero. Hits are never reordered or modified here.
pub fn apply_score_floor(hits: Vec<RankedHit>, threshold: f32) -> Vec<RankedHit> {
    let before = hits.len();
    let kept: Vec<RankedHit> = hits
        .into_iter()
        .filter(|hit| hit.final_score >= threshold)
        .collect();
    if kept.len() < before {
        debug!(
            dropped = before - kept.len(),
            threshold, "dropped hits below the relevance floor"
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentId;
    use serde_json::json;

    fn hit(doc: &str, final_score: f32) -> RankedHit {
        RankedHit {
            id: DocumentId::new(doc),
            score: final_score,
            metadata: json!({}),
            chunk_matches: 1,
            reranker_score: None,
            final_score,
        }
    }

    #[test]
    fn boundary_is_inclusive() {
        let hits = vec![hit("kept", -15.0), hit("dropped", -20.0)];
        let kept = apply_score_floor(hits, -15.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id.as_str(), "kept");
    }

    #[test]
    fn order_is_preserved() {
        let hits = vec![hit("a", 3.0), hit("b", 1.0), hit("c", 2.0)];
        let kept = apply_score_floor(hits, 1.5);
        let ids: Vec<&str> = kept.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn negative_thresholds_keep_negative_scores() {
        let kept = apply_score_floor(vec![hit("a", -3.2)], -10.0);
        assert_eq!(kept.len(), 1);
    }
}
