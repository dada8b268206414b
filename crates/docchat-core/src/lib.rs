//! All backend logic independent of how the app is run.
//!
//! A document is chunked into passages, each passage is embedded, and questions are
//! answered from the passages closest to the question. Everything lives in a
//! [`Session`]; nothing is persisted except config (see [app_data]).

pub mod answer;
pub mod app_data;
pub mod chunks;
pub mod config;
pub mod document;
pub mod embedder;
pub mod ollama;
pub mod retriever;
pub mod session;
pub mod store;

pub use answer::{
    answer, answer_stream, collect_fragments, compose_context, compose_prompt, Answer, AnswerError,
    AnswerStream, FragmentStream, Generator,
};
pub use app_data::app_data_dir;
pub use chunks::{chunk, chunk_with, ChunkOptions, Passage, DEFAULT_CHUNK_SIZE};
pub use config::{config_path, load_config, load_config_from, save_config, Config, ConfigError};
pub use document::{load_document, Document, DocumentError, DocumentFormat};
pub use embedder::{
    Embedder, EmbedderOptions, Embedding, EmbeddingProvider, FallbackReason, ProviderEmbedding,
    ProviderError, TaskType,
};
pub use ollama::{OllamaClient, OllamaError};
pub use retriever::{retrieve, retrieve_ranked, RankedPassage, RetrieveError};
pub use session::Session;
pub use store::{cosine_similarity, rank, EmbeddingMatrix, ShapeError};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "docchat-core ready"
}
