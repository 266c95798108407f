use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::vector::VectorStore;
use crate::llm::embeddings::Embedder;
use crate::models::Document;

/// Nearest-neighbour lookup by text. Scores are distances: lower is closer.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>>;

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        Ok(self
            .similarity_search_with_score(query, k)
            .await?
            .into_iter()
            .map(|(doc, _)| doc)
            .collect())
    }
}

/// A named vector store paired with the embedder that feeds it.
pub struct Collection {
    name: String,
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
}

impl Collection {
    pub fn open(dir: &Path, name: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let store = VectorStore::open_or_create(dir, name)?;
        tracing::info!("Opened collection {name} with {} entries", store.len());
        Ok(Self {
            name: name.to_string(),
            store,
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Embed and append documents. Returns how many were stored.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        let ids = self.store.add(documents, embeddings)?;

        tracing::info!(
            "Added {} documents to {} ({} total)",
            ids.len(),
            self.name,
            self.store.len()
        );
        Ok(ids.len())
    }
}

#[async_trait]
impl SimilaritySearch for Collection {
    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>> {
        if k == 0 || self.store.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_query(query).await?;
        Ok(self
            .store
            .search(&embedding, k)
            .into_iter()
            .map(|hit| (hit.document, hit.distance))
            .collect())
    }
}
