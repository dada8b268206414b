//! Turns passages and queries into fixed-dimension vectors.
//!
//! Embedding never fails from the caller's point of view. Blank input, provider
//! errors, timeouts and malformed responses all degrade to a zero vector of the
//! configured dimension, tagged with the reason, so a passage matrix is always
//! rectangular and one bad passage only costs that passage.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::chunks::Passage;
use crate::store::EmbeddingMatrix;

/// Dimension of `nomic-embed-text`, the default embedding model.
pub const DEFAULT_DIMENSION: usize = 768;
/// Longest input (in characters) sent to the provider; longer text keeps its prefix.
pub const DEFAULT_MAX_CHARS: usize = 3000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What the text will be used for. Providers may embed documents and queries differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "retrieval_document",
            TaskType::RetrievalQuery => "retrieval_query",
        }
    }
}

/// A vector as returned by a provider, before it is checked against the expected dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEmbedding {
    pub vector: Vec<f32>,
    pub dimension: usize,
}

impl ProviderEmbedding {
    pub fn new(vector: Vec<f32>) -> Self {
        let dimension = vector.len();
        Self { vector, dimension }
    }
}

/// Failure of an embedding or generation backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider returned no embedding")]
    EmptyResponse,
}

/// Anything that can embed a single text with a given model and task type.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(
        &self,
        text: &str,
        model: &str,
        task: TaskType,
    ) -> Result<ProviderEmbedding, ProviderError>;
}

/// Why an embedding is a zero vector instead of a computed one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FallbackReason {
    #[error("empty input")]
    EmptyInput,
    #[error("provider error: {0}")]
    Provider(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("response declares {declared} dimensions but carries {actual} values")]
    InconsistentResponse { declared: usize, actual: usize },
}

/// Result of embedding one text. Both variants hold a vector of the embedder's dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    Computed(Vec<f32>),
    Fallback {
        vector: Vec<f32>,
        reason: FallbackReason,
    },
}

impl Embedding {
    /// Zero vector of `dimension`, tagged with `reason`.
    pub fn zero(dimension: usize, reason: FallbackReason) -> Self {
        Embedding::Fallback {
            vector: vec![0.0; dimension],
            reason,
        }
    }

    pub fn vector(&self) -> &[f32] {
        match self {
            Embedding::Computed(v) => v,
            Embedding::Fallback { vector, .. } => vector,
        }
    }

    pub fn into_vector(self) -> Vec<f32> {
        match self {
            Embedding::Computed(v) => v,
            Embedding::Fallback { vector, .. } => vector,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Embedding::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Embedding::Computed(_) => None,
            Embedding::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Model and limits used for every embedding call.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedderOptions {
    pub model: String,
    pub dimension: usize,
    /// 0 disables truncation.
    pub max_chars: usize,
    pub timeout: Duration,
    /// Max provider calls in flight during a batch.
    pub concurrency: usize,
}

impl Default for EmbedderOptions {
    fn default() -> Self {
        Self {
            model: crate::ollama::DEFAULT_EMBED_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            max_chars: DEFAULT_MAX_CHARS,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Wraps a provider with truncation, timeout, validation and zero-vector fallback.
#[derive(Debug, Clone)]
pub struct Embedder<P> {
    provider: P,
    options: EmbedderOptions,
}

impl<P: EmbeddingProvider> Embedder<P> {
    pub fn new(provider: P, options: EmbedderOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn options(&self) -> &EmbedderOptions {
        &self.options
    }

    pub fn dimension(&self) -> usize {
        self.options.dimension
    }

    /// Embed one text. Always returns a vector of `dimension` values.
    pub async fn embed(&self, text: &str, task: TaskType) -> Embedding {
        let dimension = self.options.dimension;
        if text.trim().is_empty() {
            return Embedding::zero(dimension, FallbackReason::EmptyInput);
        }
        let text = truncate_chars(text, self.options.max_chars);

        let call = self.provider.embed(text, &self.options.model, task);
        let result = match tokio::time::timeout(self.options.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.options.timeout, task = task.as_str(), "embedding timed out, using zero vector");
                return Embedding::zero(dimension, FallbackReason::Timeout(self.options.timeout));
            }
        };

        match result {
            Ok(res) if res.vector.len() != res.dimension => {
                let actual = res.vector.len();
                warn!(declared = res.dimension, actual, "embedding response is inconsistent, using zero vector");
                Embedding::zero(
                    dimension,
                    FallbackReason::InconsistentResponse {
                        declared: res.dimension,
                        actual,
                    },
                )
            }
            Ok(res) if res.dimension != dimension => {
                warn!(expected = dimension, actual = res.dimension, "embedding has wrong dimension, using zero vector");
                Embedding::zero(
                    dimension,
                    FallbackReason::DimensionMismatch {
                        expected: dimension,
                        actual: res.dimension,
                    },
                )
            }
            Ok(res) => Embedding::Computed(res.vector),
            Err(e) => {
                warn!(error = %e, task = task.as_str(), "embedding failed, using zero vector");
                Embedding::zero(dimension, FallbackReason::Provider(e.to_string()))
            }
        }
    }

    pub async fn embed_query(&self, query: &str) -> Embedding {
        self.embed(query, TaskType::RetrievalQuery).await
    }

    /// Embed every passage, in order, with at most `concurrency` calls in flight.
    /// A failing passage yields a fallback for that passage only.
    pub async fn embed_each(&self, passages: &[Passage]) -> Vec<Embedding> {
        let embeddings: Vec<Embedding> = stream::iter(passages)
            .map(|p| self.embed(&p.text, TaskType::RetrievalDocument))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let degraded = embeddings.iter().filter(|e| e.is_fallback()).count();
        debug!(
            passages = passages.len(),
            degraded, "embedded passages"
        );
        embeddings
    }

    /// Embed every passage into an N×D matrix, row i for passage i.
    pub async fn embed_all(&self, passages: &[Passage]) -> EmbeddingMatrix {
        let embeddings = self.embed_each(passages).await;
        EmbeddingMatrix::from_embeddings(self.options.dimension, &embeddings)
    }
}

/// Prefix of `text` holding at most `max_chars` characters. 0 means no limit.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
