use crate::embeddings::Embedder;
use crate::traits::VectorIndex;
use crate::{QueryError, RetrievedChunk, TextChunk};
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 5;

/// Embeds `query`, searches `index` and maps the hit positions back onto `chunks`,
/// closest first.
///
/// `chunks` and `index` must come from the same corpus in the same order; a length
/// disagreement is reported as [`QueryError::CorpusMismatch`].
pub fn retrieve<I>(
    query: &str,
    index: &I,
    chunks: &[TextChunk],
    embedder: &dyn Embedder,
    top_k: usize,
) -> Result<Vec<RetrievedChunk>, QueryError>
where
    I: VectorIndex + ?Sized,
{
    if chunks.len() != index.len() {
        return Err(QueryError::CorpusMismatch {
            chunks: chunks.len(),
            indexed: index.len(),
        });
    }

    let query_vector = embedder.encode(query)?;
    let neighbors = index.search(&query_vector, top_k)?;
    debug!(top_k, hits = neighbors.len(), model = embedder.model_id(), "retrieved chunks");

    neighbors
        .into_iter()
        .map(|neighbor| {
            let chunk = chunks
                .get(neighbor.position)
                .cloned()
                .ok_or(QueryError::CorpusMismatch {
                    chunks: chunks.len(),
                    indexed: index.len(),
                })?;
            Ok(RetrievedChunk {
                position: neighbor.position,
                distance: neighbor.distance,
                chunk,
            })
        })
        .collect()
}

/// Space-joined chunk texts in retrieval order, so the closest chunk leads the context.
pub fn assemble_context(retrieved: &[RetrievedChunk]) -> String {
    retrieved
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
