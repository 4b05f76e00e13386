//! Second-pass precision scoring over a small candidate set.
//!
//! When a pairwise scorer is available the retrieval score is *replaced* by
//! the pairwise score — replace, don't blend, is deliberate. Every failure
//! path degrades silently to the retrieval ordering; reranking problems must
//! never fail a search.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::capabilities::PairwiseScorer;
use crate::types::{AggregatedCandidate, RankedHit};

/// Re-scores aggregated candidates against the raw (non-expanded) query.
pub struct Reranker {
    scorer: Option<Arc<dyn PairwiseScorer>>,
}

impl Reranker {
    pub fn new(scorer: Option<Arc<dyn PairwiseScorer>>) -> Self {
        Self { scorer }
    }

    /// Whether a pairwise scorer was configured at startup.
    pub fn available(&self) -> bool {
        self.scorer.is_some()
    }

    /// Reranks `candidates` and truncates the result to `top_k`.
    ///
    /// Scoring passages are built as `title + " " + text` from each
    /// candidate's retained metadata; candidates with empty combined text are
    /// skipped. On success each scored candidate's `final_score` is the
    /// pairwise score, the list is re-sorted descending and truncated.
    ///
    /// When reranking is disabled, no scorer is configured, fewer than two
    /// candidates exist, or the scorer fails, the input candidates are
    /// returned truncated to `top_k` in their existing order with scores
    /// untouched.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<AggregatedCandidate>,
        top_k: usize,
        enabled: bool,
    ) -> Vec<RankedHit> {
        let Some(scorer) = &self.scorer else {
            return passthrough(candidates, top_k);
        };
        if !enabled || candidates.len() < 2 {
            return passthrough(candidates, top_k);
        }

        let mut scorable = Vec::new();
        let mut pairs = Vec::new();
        for candidate in candidates.iter() {
            let passage = candidate_passage(candidate);
            if passage.is_empty() {
                continue;
            }
            pairs.push((query.to_string(), passage));
            scorable.push(candidate.clone());
        }
        if scorable.is_empty() {
            return passthrough(candidates, top_k);
        }

        let scores = match scorer.score(&pairs).await {
            Ok(scores) if scores.len() == scorable.len() => scores,
            Ok(scores) => {
                warn!(
                    expected = scorable.len(),
                    got = scores.len(),
                    "pairwise scorer returned a mismatched score count, keeping retrieval order"
                );
                return passthrough(candidates, top_k);
            }
            Err(err) => {
                warn!(%err, "reranking failed, keeping retrieval order");
                return passthrough(candidates, top_k);
            }
        };

        let mut hits: Vec<RankedHit> = scorable
            .into_iter()
            .zip(scores)
            .map(|(candidate, score)| RankedHit {
                id: candidate.doc_id,
                score,
                metadata: candidate.metadata,
                chunk_matches: candidate.chunk_matches,
                reranker_score: Some(score),
                final_score: score,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        debug!(reranked = hits.len(), "applied pairwise reranking");
        hits
    }
}

fn candidate_passage(candidate: &AggregatedCandidate) -> String {
    let title = candidate.metadata["title"].as_str().unwrap_or_default();
    let text = candidate.metadata["text"].as_str().unwrap_or_default();
    format!("{title} {text}").trim().to_string()
}

fn passthrough(candidates: Vec<AggregatedCandidate>, top_k: usize) -> Vec<RankedHit> {
    candidates
        .into_iter()
        .take(top_k)
        .map(RankedHit::from_candidate)
        .collect()
}
