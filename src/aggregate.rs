//! Collapses chunk-level retrieval matches into document-level candidates.
//!
//! A document's score is the *maximum* over its contributing matches, not an
//! average: one highly relevant chunk should out-rank a document with many
//! weakly relevant chunks.

use std::collections::HashMap;
use tracing::debug;

use crate::types::{AggregatedCandidate, ChunkId, DocumentId, RetrievalMatch};

/// Resolves the document that owns a match.
///
/// Record ids written by the vectorizer parse structurally (`{doc}_title`,
/// `{doc}_body_{n}`); an id without a recognized suffix is treated as a bare
/// document id.
fn owning_document(match_id: &str) -> DocumentId {
    match ChunkId::parse(match_id) {
        Some(chunk_id) => chunk_id.document().clone(),
        None => DocumentId::new(match_id),
    }
}

/// Groups matches by owning document and produces one candidate per document.
///
/// Per candidate: `score` is the max contributing score, `chunk_matches`
/// counts the contributing matches, and `metadata` comes from the
/// highest-scoring match (ties broken by first-seen order). Output is sorted
/// descending by score with first-seen order preserved on ties. Pure data
/// transformation; no I/O.
pub fn aggregate_matches(matches: &[RetrievalMatch]) -> Vec<AggregatedCandidate> {
    let mut candidates: Vec<AggregatedCandidate> = Vec::new();
    let mut by_doc: HashMap<DocumentId, usize> = HashMap::new();

    for m in matches {
        let doc_id = owning_document(&m.id);
        match by_doc.get(&doc_id) {
            Some(&slot) => {
                let candidate = &mut candidates[slot];
                candidate.chunk_matches += 1;
                // Strictly greater keeps the first-seen match on score ties.
                if m.score > candidate.score {
                    candidate.score = m.score;
                    candidate.metadata = m.metadata.clone();
                }
            }
            None => {
                by_doc.insert(doc_id.clone(), candidates.len());
                candidates.push(AggregatedCandidate {
                    doc_id,
                    score: m.score,
                    chunk_matches: 1,
                    metadata: m.metadata.clone(),
                });
            }
        }
    }

    // Stable sort preserves first-seen order among equal scores.
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    debug!(
        matches = matches.len(),
        documents = candidates.len(),
        "aggregated chunk matches"
    );
    candidates
}
