//! Retrieval Gate — probes the knowledge base and scores FAQ-tier
//! confidence.
//!
//! The gate is the soft boundary of the system: embedding errors, index
//! errors, and timeouts all degrade to an empty result so the tier
//! router can proceed to the general-knowledge tier. A retrieval
//! failure never aborts a chat turn.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use waypost_config::RoutingConfig;
use waypost_core::error::RetrievalError;
use waypost_core::index::{RetrievalResult, VectorIndex};
use waypost_core::provider::Provider;

/// Queries the knowledge base and applies the confidence policy.
pub struct RetrievalGate {
    provider: Arc<dyn Provider>,
    index: Arc<dyn VectorIndex>,
    config: RoutingConfig,
}

impl RetrievalGate {
    pub fn new(
        provider: Arc<dyn Provider>,
        index: Arc<dyn VectorIndex>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            provider,
            index,
            config,
        }
    }

    /// Probe the knowledge base for the top-k matches to `query`.
    ///
    /// Soft-fails: any error or timeout returns an empty result and
    /// logs at warn. The caller cannot distinguish "no knowledge" from
    /// "knowledge base unreachable", by design of the tier policy.
    pub async fn probe(&self, query: &str) -> RetrievalResult {
        let timeout = Duration::from_secs(self.config.retrieval_timeout_secs);
        match tokio::time::timeout(timeout, self.try_probe(query)).await {
            Ok(Ok(result)) => {
                debug!(
                    matches = result.matches.len(),
                    top_score = result.top_score(),
                    "Retrieval gate: probe complete"
                );
                result
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Retrieval gate: probe failed, degrading to no match");
                RetrievalResult::empty()
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.retrieval_timeout_secs,
                    "Retrieval gate: probe timed out, degrading to no match"
                );
                RetrievalResult::empty()
            }
        }
    }

    async fn try_probe(&self, query: &str) -> Result<RetrievalResult, RetrievalError> {
        let embeddings = self
            .provider
            .embed(&[query.to_string()])
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("empty embedding response".into()))?;

        let matches = self.index.query(&vector, self.config.top_k).await?;
        Ok(RetrievalResult { matches })
    }

    /// FAQ-eligible: the top score clears the base threshold T.
    pub fn is_faq_eligible(&self, result: &RetrievalResult) -> bool {
        !result.is_empty() && result.top_score() >= self.config.score_threshold
    }

    /// Fast path: the top score clears T_fast, so the stored answer is
    /// returned verbatim and the generation step is skipped entirely.
    pub fn is_fast_path(&self, result: &RetrievalResult) -> bool {
        !result.is_empty() && result.top_score() >= self.config.fast_path_threshold
    }

    /// Render the matches into a `Q:`/`A:` context block, bounded by
    /// the configured character budget. Whole entries only: an entry
    /// that would overflow the budget is dropped along with everything
    /// after it (matches are already ordered best-first).
    pub fn context_block(&self, result: &RetrievalResult) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut chars = 0usize;

        for m in &result.matches {
            let qa = format!("Q: {}\nA: {}\n", m.payload.question, m.payload.answer);
            if chars + qa.len() > self.config.max_context_chars {
                break;
            }
            chars += qa.len();
            parts.push(qa);
        }

        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use waypost_core::error::ProviderError;
    use waypost_core::index::{KnowledgePayload, RetrievalMatch};
    use waypost_core::provider::{GenerateRequest, GenerateResponse};

    /// Embeds every text to a fixed vector; counts calls.
    struct FixedEmbedProvider {
        vector: Vec<f32>,
        calls: Mutex<usize>,
    }

    impl FixedEmbedProvider {
        fn new(vector: Vec<f32>) -> Self {
            Self {
                vector,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for FixedEmbedProvider {
        fn name(&self) -> &str {
            "fixed-embed"
        }

        async fn generate(
            &self,
            _request: GenerateRequest,
        ) -> Result<GenerateResponse, ProviderError> {
            unreachable!("gate never generates")
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
    }

    /// A provider whose embed call always fails.
    struct FailingEmbedProvider;

    #[async_trait]
    impl Provider for FailingEmbedProvider {
        fn name(&self) -> &str {
            "failing-embed"
        }

        async fn generate(
            &self,
            _request: GenerateRequest,
        ) -> Result<GenerateResponse, ProviderError> {
            unreachable!()
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Err(ProviderError::Network("connection refused".into()))
        }
    }

    /// A provider whose embed call hangs (for timeout testing).
    struct HangingEmbedProvider;

    #[async_trait]
    impl Provider for HangingEmbedProvider {
        fn name(&self) -> &str {
            "hanging-embed"
        }

        async fn generate(
            &self,
            _request: GenerateRequest,
        ) -> Result<GenerateResponse, ProviderError> {
            unreachable!()
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    /// An index scripted to return a fixed match list.
    struct ScriptedIndex {
        matches: Vec<RetrievalMatch>,
    }

    #[async_trait]
    impl VectorIndex for ScriptedIndex {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn upsert(
            &self,
            _id: String,
            _vector: Vec<f32>,
            _payload: KnowledgePayload,
        ) -> Result<(), RetrievalError> {
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            k: usize,
        ) -> Result<Vec<RetrievalMatch>, RetrievalError> {
            Ok(self.matches.iter().take(k).cloned().collect())
        }

        async fn len(&self) -> Result<usize, RetrievalError> {
            Ok(self.matches.len())
        }
    }

    /// An index whose queries always fail.
    struct BrokenIndex;

    #[async_trait]
    impl VectorIndex for BrokenIndex {
        fn name(&self) -> &str {
            "broken"
        }

        async fn upsert(
            &self,
            _id: String,
            _vector: Vec<f32>,
            _payload: KnowledgePayload,
        ) -> Result<(), RetrievalError> {
            Err(RetrievalError::Upsert("down".into()))
        }

        async fn query(
            &self,
            _vector: &[f32],
            _k: usize,
        ) -> Result<Vec<RetrievalMatch>, RetrievalError> {
            Err(RetrievalError::Index("down".into()))
        }

        async fn len(&self) -> Result<usize, RetrievalError> {
            Err(RetrievalError::Index("down".into()))
        }
    }

    fn matched(id: &str, score: f32, question: &str, answer: &str) -> RetrievalMatch {
        RetrievalMatch {
            id: id.into(),
            score,
            payload: KnowledgePayload {
                question: question.into(),
                answer: answer.into(),
            },
        }
    }

    fn gate_with(
        matches: Vec<RetrievalMatch>,
        config: RoutingConfig,
    ) -> RetrievalGate {
        RetrievalGate::new(
            Arc::new(FixedEmbedProvider::new(vec![1.0, 0.0])),
            Arc::new(ScriptedIndex { matches }),
            config,
        )
    }

    #[tokio::test]
    async fn probe_returns_ranked_matches() {
        let gate = gate_with(
            vec![
                matched("a", 0.92, "How do I reset my password?", "Use the reset link."),
                matched("b", 0.40, "What is the refund window?", "30 days."),
            ],
            RoutingConfig::default(),
        );

        let result = gate.probe("I can't log in").await;
        assert_eq!(result.matches.len(), 2);
        assert!((result.top_score() - 0.92).abs() < 1e-6);
        assert!(gate.is_fast_path(&result));
        assert!(gate.is_faq_eligible(&result));
    }

    #[tokio::test]
    async fn eligibility_thresholds() {
        let config = RoutingConfig::default(); // T = 0.75, T_fast = 0.90

        let gate = gate_with(vec![matched("a", 0.80, "q", "a")], config.clone());
        let result = gate.probe("x").await;
        assert!(gate.is_faq_eligible(&result));
        assert!(!gate.is_fast_path(&result));

        let gate = gate_with(vec![matched("a", 0.40, "q", "a")], config);
        let result = gate.probe("x").await;
        assert!(!gate.is_faq_eligible(&result));
        assert!(!gate.is_fast_path(&result));
    }

    #[tokio::test]
    async fn embed_failure_degrades_to_empty() {
        let gate = RetrievalGate::new(
            Arc::new(FailingEmbedProvider),
            Arc::new(ScriptedIndex {
                matches: vec![matched("a", 0.99, "q", "a")],
            }),
            RoutingConfig::default(),
        );

        let result = gate.probe("anything").await;
        assert!(result.is_empty());
        assert!(!gate.is_faq_eligible(&result));
    }

    #[tokio::test]
    async fn index_failure_degrades_to_empty() {
        let gate = RetrievalGate::new(
            Arc::new(FixedEmbedProvider::new(vec![1.0])),
            Arc::new(BrokenIndex),
            RoutingConfig::default(),
        );

        let result = gate.probe("anything").await;
        assert!(result.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn probe_timeout_degrades_to_empty() {
        let config = RoutingConfig {
            retrieval_timeout_secs: 1,
            ..RoutingConfig::default()
        };
        let gate = RetrievalGate::new(
            Arc::new(HangingEmbedProvider),
            Arc::new(ScriptedIndex { matches: vec![] }),
            config,
        );

        // Paused time auto-advances to the gate's timeout while the
        // embed call hangs
        let result = gate.probe("anything").await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn context_block_caps_at_budget() {
        let config = RoutingConfig {
            max_context_chars: 60,
            ..RoutingConfig::default()
        };
        let gate = gate_with(
            vec![
                matched("a", 0.9, "Short question?", "Short answer."),
                matched("b", 0.8, "Another question that is quite a bit longer?", "And a long answer to go with it."),
            ],
            config,
        );

        let result = gate.probe("x").await;
        let block = gate.context_block(&result);
        assert!(block.contains("Short question?"));
        // Second entry would overflow the 60-char budget
        assert!(!block.contains("Another question"));
        assert!(block.len() <= 60);
    }

    #[tokio::test]
    async fn context_block_empty_for_no_matches() {
        let gate = gate_with(vec![], RoutingConfig::default());
        let result = gate.probe("x").await;
        assert_eq!(gate.context_block(&result), "");
    }
}
