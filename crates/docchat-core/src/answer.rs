//! Answering a question: retrieve context, build the prompt, stream the model's reply.
//! Unlike embedding, a failed generation has no useful fallback and is returned as an error.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use thiserror::Error;

use crate::chunks::Passage;
use crate::embedder::{Embedder, EmbeddingProvider, ProviderError};
use crate::retriever::{RankedPassage, RetrieveError};
use crate::session::Session;

/// Answer text as it arrives. Finite, and can only be consumed once.
pub type FragmentStream = BoxStream<'static, Result<String, ProviderError>>;

/// A generative model that turns a prompt into a stream of answer fragments.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, ProviderError>;
}

/// An answer being generated, with the passages it was given.
pub struct AnswerStream {
    /// Passages given to the model, best first.
    pub sources: Vec<RankedPassage>,
    pub fragments: FragmentStream,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<RankedPassage>,
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("question is empty")]
    EmptyQuestion,
    #[error("retrieval failed: {0}")]
    Retrieve(#[from] RetrieveError),
    #[error("answer generation failed: {0}")]
    Generation(#[from] ProviderError),
}

/// Context passages joined with blank lines, in the order given.
pub fn compose_context<'a>(passages: impl IntoIterator<Item = &'a Passage>) -> String {
    passages
        .into_iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn compose_prompt<'a>(
    passages: impl IntoIterator<Item = &'a Passage>,
    question: &str,
) -> String {
    format!(
        "Answer the question based on the following context:\n\n{}\n\nQuestion: {}",
        compose_context(passages),
        question
    )
}

/// Retrieves the `top_k` best passages from `session` and starts generating an answer.
pub async fn answer_stream<P: EmbeddingProvider, G: Generator>(
    session: &Session,
    embedder: &Embedder<P>,
    generator: &G,
    question: &str,
    top_k: usize,
) -> Result<AnswerStream, AnswerError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AnswerError::EmptyQuestion);
    }
    let sources = session.retrieve(embedder, question, top_k).await?;
    let prompt = compose_prompt(sources.iter().map(|r| &r.passage), question);
    tracing::debug!(sources = sources.len(), prompt_chars = prompt.len(), "generating answer");
    let fragments = generator.generate_stream(&prompt).await?;
    Ok(AnswerStream { sources, fragments })
}

/// Like [`answer_stream`], waiting for the whole answer.
pub async fn answer<P: EmbeddingProvider, G: Generator>(
    session: &Session,
    embedder: &Embedder<P>,
    generator: &G,
    question: &str,
    top_k: usize,
) -> Result<Answer, AnswerError> {
    let AnswerStream { sources, fragments } =
        answer_stream(session, embedder, generator, question, top_k).await?;
    let text = collect_fragments(fragments).await?;
    Ok(Answer { text, sources })
}

/// Concatenates a fragment stream, stopping at the first error.
pub async fn collect_fragments(mut fragments: FragmentStream) -> Result<String, ProviderError> {
    let mut text = String::new();
    while let Some(fragment) = fragments.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}
