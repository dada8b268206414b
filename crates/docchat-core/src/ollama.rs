//! Ollama client for embeddings and answer generation. Wraps ollama-rs behind the
//! [`EmbeddingProvider`] and [`Generator`] traits.

use async_trait::async_trait;
use futures::StreamExt;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::Ollama;
use thiserror::Error;

use crate::answer::{FragmentStream, Generator};
use crate::embedder::{EmbeddingProvider, ProviderEmbedding, ProviderError, TaskType};

pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_CHAT_MODEL: &str = "llama3.2";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Thin wrapper around Ollama. Cheap to clone; holds no per-document state.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    inner: Ollama,
    chat_model: String,
    task_prefixes: bool,
}

impl OllamaClient {
    /// Create from URL string, e.g. `http://localhost:11434`.
    pub fn from_url(url: &str) -> Result<Self, OllamaError> {
        let inner = Ollama::try_new(url).map_err(OllamaError::ParseUrl)?;
        Ok(Self {
            inner,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            task_prefixes: true,
        })
    }

    /// Set the model used for answers (e.g. `llama3.2`, `mistral`).
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Prepend `search_document: ` / `search_query: ` to embedded text.
    /// nomic-embed-text is trained with these; turn off for models that aren't.
    pub fn with_task_prefixes(mut self, enabled: bool) -> Self {
        self.task_prefixes = enabled;
        self
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    fn embed_input(&self, text: &str, task: TaskType) -> String {
        if !self.task_prefixes {
            return text.to_string();
        }
        let prefix = match task {
            TaskType::RetrievalDocument => "search_document: ",
            TaskType::RetrievalQuery => "search_query: ",
        };
        format!("{prefix}{text}")
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(
        &self,
        text: &str,
        model: &str,
        task: TaskType,
    ) -> Result<ProviderEmbedding, ProviderError> {
        let req = GenerateEmbeddingsRequest::new(
            model.to_string(),
            EmbeddingsInput::Single(self.embed_input(text, task)),
        );
        let res = self
            .inner
            .generate_embeddings(req)
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        let vector = res
            .embeddings
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;
        Ok(ProviderEmbedding::new(vector))
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, ProviderError> {
        let req = GenerationRequest::new(self.chat_model.clone(), prompt.to_string());
        let stream = self
            .inner
            .generate_stream(req)
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        // each item is a batch of responses; join their text into one fragment
        Ok(stream
            .map(|batch| {
                batch
                    .map(|responses| responses.into_iter().map(|r| r.response).collect::<String>())
                    .map_err(|e| ProviderError::Request(e.to_string()))
            })
            .boxed())
    }
}

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("invalid Ollama URL: {0}")]
    ParseUrl(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_url() {
        assert!(matches!(
            OllamaClient::from_url("not a url"),
            Err(OllamaError::ParseUrl(_))
        ));
    }

    #[test]
    fn task_prefixes_follow_task_type() {
        let client = OllamaClient::from_url(DEFAULT_BASE_URL).unwrap();
        assert_eq!(
            client.embed_input("sky", TaskType::RetrievalDocument),
            "search_document: sky"
        );
        assert_eq!(
            client.embed_input("sky?", TaskType::RetrievalQuery),
            "search_query: sky?"
        );
        let plain = client.with_task_prefixes(false);
        assert_eq!(plain.embed_input("sky", TaskType::RetrievalQuery), "sky");
    }

    #[test]
    fn chat_model_is_configurable() {
        let client = OllamaClient::from_url(DEFAULT_BASE_URL)
            .unwrap()
            .with_chat_model("mistral");
        assert_eq!(client.chat_model(), "mistral");
    }
}
