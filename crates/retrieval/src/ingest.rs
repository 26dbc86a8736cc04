//! Knowledge ingestion — embeds question/answer pairs and upserts them
//! into the vector index.
//!
//! Item ids are uuid-v5 of the question text, so re-ingesting an
//! identical question overwrites the prior vector instead of creating a
//! duplicate.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use waypost_core::error::{Error, RetrievalError};
use waypost_core::index::{KnowledgePayload, VectorIndex};
use waypost_core::provider::Provider;

/// Embeds and upserts knowledge items.
pub struct KnowledgeIngestor {
    provider: Arc<dyn Provider>,
    index: Arc<dyn VectorIndex>,
}

impl KnowledgeIngestor {
    pub fn new(provider: Arc<dyn Provider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { provider, index }
    }

    /// Deterministic item id for a question.
    pub fn item_id(question: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, question.as_bytes()).to_string()
    }

    /// Embed and upsert the given items. Returns the count ingested.
    ///
    /// Unlike retrieval, ingestion failures are hard errors: a
    /// half-written knowledge base is worse than a failed ingest
    /// request the caller can retry.
    pub async fn ingest(&self, items: Vec<KnowledgePayload>) -> Result<usize, Error> {
        if items.is_empty() {
            return Ok(0);
        }

        // Embed question + answer together: the answer text often
        // carries the vocabulary users actually search with.
        let texts: Vec<String> = items
            .iter()
            .map(|it| format!("{}\n{}", it.question, it.answer))
            .collect();

        let vectors = self
            .provider
            .embed(&texts)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        if vectors.len() != items.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} embeddings, got {}",
                items.len(),
                vectors.len()
            ))
            .into());
        }

        let count = items.len();
        for (item, vector) in items.into_iter().zip(vectors) {
            let id = Self::item_id(&item.question);
            self.index.upsert(id, vector, item).await?;
        }

        info!(count, "Knowledge ingested");
        Ok(count)
    }
}
