//! Query-time retrieval: embed the query, rank passage vectors, return the best passages.

use thiserror::Error;
use tracing::{debug, warn};

use crate::chunks::Passage;
use crate::embedder::{Embedder, EmbeddingProvider};
use crate::store::{rank, EmbeddingMatrix};

/// A retrieved passage with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPassage {
    pub passage: Passage,
    pub score: f32,
}

/// Passages and vectors that can't be ranked against each other.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrieveError {
    #[error("{passages} passage(s) but {rows} vector row(s)")]
    RowCountMismatch { passages: usize, rows: usize },
    #[error("vectors have {actual} dimensions, the embedder produces {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Up to `top_k` passages most similar to `query`, best first.
///
/// `vectors` row i must belong to `passages[i]` and have the embedder's dimension;
/// anything else is an error rather than a ranking. If the query embedding falls
/// back to a zero vector every score is 0 and the result is the first `top_k`
/// passages in document order.
pub async fn retrieve_ranked<P: EmbeddingProvider>(
    embedder: &Embedder<P>,
    query: &str,
    passages: &[Passage],
    vectors: &EmbeddingMatrix,
    top_k: usize,
) -> Result<Vec<RankedPassage>, RetrieveError> {
    if passages.len() != vectors.len() {
        warn!(passages = passages.len(), rows = vectors.len(), "passages and vectors differ in length");
        return Err(RetrieveError::RowCountMismatch {
            passages: passages.len(),
            rows: vectors.len(),
        });
    }
    if vectors.dimension() != embedder.dimension() {
        warn!(expected = embedder.dimension(), actual = vectors.dimension(), "vector dimension differs from embedder");
        return Err(RetrieveError::DimensionMismatch {
            expected: embedder.dimension(),
            actual: vectors.dimension(),
        });
    }
    if top_k == 0 || passages.is_empty() {
        return Ok(Vec::new());
    }
    let query_embedding = embedder.embed_query(query).await;
    if let Some(reason) = query_embedding.fallback_reason() {
        debug!(%reason, "query embedding degraded, ranking falls back to document order");
    }

    Ok(rank(query_embedding.vector(), vectors, top_k)
        .into_iter()
        .map(|(i, score)| RankedPassage {
            passage: passages[i].clone(),
            score,
        })
        .collect())
}

/// Like [`retrieve_ranked`], without scores.
pub async fn retrieve<P: EmbeddingProvider>(
    embedder: &Embedder<P>,
    query: &str,
    passages: &[Passage],
    vectors: &EmbeddingMatrix,
    top_k: usize,
) -> Result<Vec<Passage>, RetrieveError> {
    Ok(retrieve_ranked(embedder, query, passages, vectors, top_k)
        .await?
        .into_iter()
        .map(|r| r.passage)
        .collect())
}
