//! Action Suggester — derives candidate next actions from the recent
//! topic and routing outcome.
//!
//! Purely additive: never blocks or alters the chat response. A failed
//! topic analysis falls back to a generic topic; a failed suggestion
//! generation falls back to a fixed list. No path returns an error to
//! the end user.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use waypost_core::provider::{GenerateRequest, PromptKind, Provider};
use waypost_core::turn::{AnswerTier, Turn};

use crate::prompts::PromptLibrary;

/// How many recent turns of history feed the suggestion prompt.
const SUGGEST_HISTORY_TURNS: usize = 3;

/// Lead-ins that mark a generated line as filler rather than a usable
/// suggestion.
const FILLER_PREFIXES: [&str; 4] = ["here", "you can", "please", "thank"];

pub struct ActionSuggester {
    provider: Arc<dyn Provider>,
    prompts: PromptLibrary,
    chat_model: String,
    count: usize,
    generate_timeout: Duration,
}

impl ActionSuggester {
    pub fn new(
        provider: Arc<dyn Provider>,
        prompts: PromptLibrary,
        chat_model: impl Into<String>,
        count: usize,
        generate_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            prompts,
            chat_model: chat_model.into(),
            count,
            generate_timeout,
        }
    }

    /// Suggest next actions for the given question, history, and the
    /// tier that answered it. Infallible by contract.
    pub async fn suggest(
        &self,
        query: &str,
        history: &[Turn],
        faq_context: &str,
        tier: Option<AnswerTier>,
    ) -> Vec<String> {
        let topic = self.analyze_topic(query, tier).await;

        let start = history.len().saturating_sub(SUGGEST_HISTORY_TURNS);
        let history_text: String = history[start..]
            .iter()
            .flat_map(|t| {
                [
                    format!("User: {}", t.message),
                    format!("Assistant: {}", t.answer),
                ]
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt =
            self.prompts
                .action_suggestions(query, &topic, &history_text, faq_context, self.count);
        let request = GenerateRequest::new(&self.chat_model, prompt, PromptKind::ActionSuggestions);

        let generated =
            tokio::time::timeout(self.generate_timeout, self.provider.generate(request)).await;

        match generated {
            Ok(Ok(response)) => {
                let actions = parse_suggestions(&response.text, self.count);
                if actions.is_empty() {
                    self.fallback(tier)
                } else {
                    actions
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Suggester: generation failed, using fallback list");
                self.fallback(tier)
            }
            Err(_) => {
                warn!("Suggester: generation timed out, using fallback list");
                self.fallback(tier)
            }
        }
    }

    /// Classify the question into a short topic, degrading to a generic
    /// one on any failure. Escalated turns skip the model call: the
    /// topic is the handoff itself.
    async fn analyze_topic(&self, query: &str, tier: Option<AnswerTier>) -> String {
        if tier == Some(AnswerTier::Escalated) {
            return "human support handoff".into();
        }

        let request = GenerateRequest::new(
            &self.chat_model,
            self.prompts.topic_analysis(query),
            PromptKind::TopicAnalysis,
        );

        match tokio::time::timeout(self.generate_timeout, self.provider.generate(request)).await {
            Ok(Ok(response)) if !response.text.trim().is_empty() => {
                response.text.trim().to_lowercase()
            }
            Ok(Ok(_)) => "general support".into(),
            Ok(Err(e)) => {
                warn!(error = %e, "Suggester: topic analysis failed");
                "general support".into()
            }
            Err(_) => {
                warn!("Suggester: topic analysis timed out");
                "general support".into()
            }
        }
    }

    /// The fixed list used when generation yields nothing usable.
    /// Escalated sessions bias toward reaching a human.
    fn fallback(&self, tier: Option<AnswerTier>) -> Vec<String> {
        let actions: &[&str] = if tier == Some(AnswerTier::Escalated) {
            &[
                "Would you like me to share your conversation with the support team?",
                "Can you provide your contact details so an agent can reach you?",
                "Is there anything else I can note for the human agent?",
                "Do you want to check the status of an existing support request?",
            ]
        } else {
            &[
                "Can you provide more details about your specific situation?",
                "Would you like me to walk you through the steps?",
                "Do you need help with anything else related to this?",
                "Is there a specific part you're having trouble with?",
            ]
        };
        actions
            .iter()
            .take(self.count)
            .map(|s| s.to_string())
            .collect()
    }
}

/// Split a generated response into usable suggestion lines: one per
/// line, longer than 10 chars, not starting with a filler lead-in,
/// capped at `count`.
fn parse_suggestions(text: &str, count: usize) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| line.len() > 10)
        .filter(|line| {
            let lower = line.to_lowercase();
            !FILLER_PREFIXES.iter().any(|p| lower.starts_with(p))
        })
        .map(str::to_string)
        .take(count)
        .collect()
}
