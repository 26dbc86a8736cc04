//! Provider trait — the abstraction over the generative model and the
//! embedding service.
//!
//! A Provider knows how to turn a rendered prompt into text and a batch
//! of texts into fixed-length vectors. The engine calls `generate()` and
//! `embed()` without knowing which backend is configured.
//!
//! Implementations: OpenAI-compatible HTTP endpoints, mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// Which prompt template a generation request was rendered from.
///
/// Carried on the request so providers and logs can distinguish the
/// grounded FAQ path from the open-domain path without parsing prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Answer grounded in retrieved FAQ context
    FaqGrounded,
    /// Open-domain answer, may emit the escalation sentinel
    General,
    /// Conversation summarization
    Summary,
    /// Short topic classification for the suggester
    TopicAnalysis,
    /// Next-action suggestion generation
    ActionSuggestions,
}

/// A single generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model to use (e.g., "gpt-4o-mini", "gemini-2.5-flash")
    pub model: String,

    /// The fully rendered prompt
    pub prompt: String,

    /// Which template produced the prompt
    pub kind: PromptKind,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, kind: PromptKind) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            kind,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The generated text, whitespace-trimmed
    pub text: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// The core Provider trait.
///
/// Every backend implements this trait. The engine calls `generate()`
/// or `embed()` without knowing which provider is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Render a prompt into text.
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<GenerateResponse, ProviderError>;

    /// Generate embeddings for the given texts, one vector per input.
    ///
    /// Must be deterministic for identical input within a model version.
    /// Default implementation reports embeddings as unsupported.
    async fn embed(
        &self,
        _texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support embeddings",
            self.name()
        )))
    }

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
