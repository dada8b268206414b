//! Session pipeline: document → chunk → embed. Holds one document and its vectors in memory.
//!
//! Processing a new document means building a new `Session`; nothing is shared
//! between sessions except the provider client.

use std::path::Path;

use tracing::info;
use uuid::Uuid;

use crate::chunks::{chunk_with, ChunkOptions, Passage};
use crate::document::{load_document, Document, DocumentError};
use crate::embedder::{Embedder, EmbeddingProvider};
use crate::retriever::{retrieve_ranked, RankedPassage, RetrieveError};
use crate::store::EmbeddingMatrix;

#[derive(Debug, Clone)]
pub struct Session {
    document_id: Uuid,
    document: Document,
    passages: Vec<Passage>,
    vectors: EmbeddingMatrix,
    /// Passages whose vector is a zero-vector fallback.
    degraded: usize,
}

impl Session {
    /// Chunks and embeds `document`. Embedding failures degrade single passages and
    /// never fail the build.
    pub async fn build<P: EmbeddingProvider>(
        document: Document,
        embedder: &Embedder<P>,
        options: &ChunkOptions,
    ) -> Self {
        let passages = chunk_with(&document.text, options);
        let embeddings = embedder.embed_each(&passages).await;
        let degraded = embeddings.iter().filter(|e| e.is_fallback()).count();
        let vectors = EmbeddingMatrix::from_embeddings(embedder.dimension(), &embeddings);

        let session = Self {
            document_id: Uuid::new_v4(),
            document,
            passages,
            vectors,
            degraded,
        };
        info!(
            document = %session.document.name,
            id = %session.document_id,
            passages = session.passages.len(),
            degraded = session.degraded,
            "document processed"
        );
        session
    }

    /// Loads the file at `path` and builds a session for it.
    pub async fn open<P: EmbeddingProvider>(
        path: &Path,
        embedder: &Embedder<P>,
        options: &ChunkOptions,
    ) -> Result<Self, DocumentError> {
        let document = load_document(path)?;
        Ok(Self::build(document, embedder, options).await)
    }

    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn vectors(&self) -> &EmbeddingMatrix {
        &self.vectors
    }

    pub fn degraded(&self) -> usize {
        self.degraded
    }

    /// The `top_k` passages most relevant to `query`, best first.
    /// Fails only if `embedder` has a different dimension than the one that built the session.
    pub async fn retrieve<P: EmbeddingProvider>(
        &self,
        embedder: &Embedder<P>,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RankedPassage>, RetrieveError> {
        retrieve_ranked(embedder, query, &self.passages, &self.vectors, top_k).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::embedder::testing::MockProvider;
    use crate::embedder::EmbedderOptions;

    fn embedder(provider: MockProvider) -> Embedder<MockProvider> {
        Embedder::new(
            provider,
            EmbedderOptions {
                model: "test-model".to_string(),
                dimension: 2,
                max_chars: 3000,
                timeout: Duration::from_secs(5),
                concurrency: 4,
            },
        )
    }

    fn opts(chunk_size: usize) -> ChunkOptions {
        ChunkOptions {
            chunk_size,
            overlap: 0,
        }
    }

    #[tokio::test]
    async fn build_embeds_every_passage() {
        let doc = Document::from_text("doc.txt", "aaaa".repeat(10));
        let s = Session::build(doc, &embedder(MockProvider::new(2)), &opts(8)).await;
        assert_eq!(s.passages().len(), 5);
        assert_eq!(s.vectors().len(), 5);
        assert_eq!(s.vectors().dimension(), 2);
        assert_eq!(s.degraded(), 0);
    }

    #[tokio::test]
    async fn failed_passages_are_counted_not_fatal() {
        let doc = Document::from_text("doc.txt", "okokFAIL");
        let s = Session::build(doc, &embedder(MockProvider::new(2)), &opts(4)).await;
        assert_eq!(s.vectors().len(), 2);
        assert_eq!(s.degraded(), 1);
        assert_eq!(s.vectors().row(1), &[0.0, 0.0]);
    }

    #[tokio::test]
    async fn empty_document_has_empty_session() {
        let e = embedder(MockProvider::new(2));
        let s = Session::build(Document::from_text("empty.txt", ""), &e, &opts(8)).await;
        assert!(s.passages().is_empty());
        assert!(s.vectors().is_empty());
        assert!(s.retrieve(&e, "anything", 5).await.unwrap().is_empty());
        assert_eq!(e.provider().calls(), 0);
    }

    #[tokio::test]
    async fn retrieve_uses_session_vectors() {
        let provider = MockProvider::new(2)
            .with("left", vec![1.0, 0.0])
            .with("rght", vec![0.0, 1.0])
            .with("go right", vec![0.1, 1.0]);
        let e = embedder(provider);
        let s = Session::build(Document::from_text("d.txt", "leftrght"), &e, &opts(4)).await;
        let top = s.retrieve(&e, "go right", 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].passage.text, "rght");
        assert_eq!(top[0].passage.index, 1);
    }

    #[tokio::test]
    async fn rebuilding_replaces_document() {
        let e = embedder(MockProvider::new(2));
        let first = Session::build(Document::from_text("a.txt", "first"), &e, &opts(8)).await;
        let second = Session::build(Document::from_text("b.txt", "second"), &e, &opts(8)).await;
        assert_ne!(first.document_id(), second.document_id());
        assert_eq!(second.document().name, "b.txt");
        assert_eq!(second.passages()[0].text, "second");
    }

    #[tokio::test]
    async fn open_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "hello there").unwrap();
        let s = Session::open(file.path(), &embedder(MockProvider::new(2)), &opts(5))
            .await
            .unwrap();
        assert_eq!(s.passages().len(), 3);
    }

    #[tokio::test]
    async fn open_rejects_unsupported_format() {
        let file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        let res = Session::open(file.path(), &embedder(MockProvider::new(2)), &opts(5)).await;
        assert!(matches!(res, Err(DocumentError::UnsupportedFormat(_))));
    }
}
