//! In-memory vector index — the reference `VectorIndex` implementation.
//!
//! Brute-force cosine scan over a `Vec` of stored vectors. Fine for the
//! FAQ-corpus sizes this system targets; larger corpora plug in an
//! external index behind the same trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use waypost_core::error::RetrievalError;
use waypost_core::index::{KnowledgePayload, RetrievalMatch, VectorIndex};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal.
/// Returns 0.0 if either vector is zero-length, empty, or the lengths
/// differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

struct IndexEntry {
    id: String,
    vector: Vec<f32>,
    payload: KnowledgePayload,
}

/// An in-memory index storing vectors in a Vec behind an RwLock.
pub struct InMemoryIndex {
    entries: Arc<RwLock<Vec<IndexEntry>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(
        &self,
        id: String,
        vector: Vec<f32>,
        payload: KnowledgePayload,
    ) -> Result<(), RetrievalError> {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => {
                existing.vector = vector;
                existing.payload = payload;
            }
            None => entries.push(IndexEntry {
                id,
                vector,
                payload,
            }),
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievalMatch>, RetrievalError> {
        let entries = self.entries.read().await;

        let mut scored: Vec<RetrievalMatch> = entries
            .iter()
            .map(|e| RetrievalMatch {
                id: e.id.clone(),
                score: cosine_similarity(&e.vector, vector),
                payload: e.payload.clone(),
            })
            .collect();

        // Descending by score; equal scores order by ascending id so
        // ranking is stable across runs.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn len(&self) -> Result<usize, RetrievalError> {
        Ok(self.entries.read().await.len())
    }
}
