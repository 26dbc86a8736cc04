//! VectorIndex trait — the abstraction over the knowledge-base index.
//!
//! The index is a black box to the engine: vectors go in via `upsert`,
//! ranked `(id, score, payload)` matches come out of `query`. Scores are
//! cosine similarities in [0, 1] for the reference implementation; any
//! comparable metric space works as long as higher means closer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// The payload stored alongside each knowledge vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePayload {
    /// The canonical question text
    pub question: String,

    /// The curated answer returned verbatim on the fast path
    pub answer: String,
}

/// A single ranked match from an index query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalMatch {
    /// Knowledge-item id
    pub id: String,

    /// Similarity score, higher is closer
    pub score: f32,

    /// The stored question/answer pair
    pub payload: KnowledgePayload,
}

/// An ordered set of matches, descending by score. Transient: built per
/// query, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub matches: Vec<RetrievalMatch>,
}

impl RetrievalResult {
    /// An empty result — the shape every retrieval failure degrades to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The best match, if any.
    pub fn top(&self) -> Option<&RetrievalMatch> {
        self.matches.first()
    }

    /// The best similarity score, or 0.0 when there are no matches.
    pub fn top_score(&self) -> f32 {
        self.top().map(|m| m.score).unwrap_or(0.0)
    }
}

/// The core VectorIndex trait.
///
/// Implementations: in-memory brute-force scan (reference), external
/// vector databases behind the same contract.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The index name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Insert or replace a vector by id.
    async fn upsert(
        &self,
        id: String,
        vector: Vec<f32>,
        payload: KnowledgePayload,
    ) -> std::result::Result<(), RetrievalError>;

    /// Return the top-k matches for a query vector, descending by score.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
    ) -> std::result::Result<Vec<RetrievalMatch>, RetrievalError>;

    /// Number of stored items.
    async fn len(&self) -> std::result::Result<usize, RetrievalError>;
}
