//! Summarizer — condenses a session's turns into a bounded summary.
//!
//! Cached by turn count: a summary computed at turn count C is returned
//! without a model call while the session still holds C turns. Model
//! failure degrades to a verbatim transcript of recent turns, never to
//! an error.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use waypost_core::error::SessionError;
use waypost_core::provider::{GenerateRequest, PromptKind, Provider};
use waypost_core::turn::{SessionId, Turn};
use waypost_session::SessionStore;

use crate::prompts::PromptLibrary;

/// Text returned for sessions with no turns; no model call is made.
pub const EMPTY_SESSION_SUMMARY: &str = "No conversation to summarize.";

pub struct Summarizer {
    provider: Arc<dyn Provider>,
    store: Arc<SessionStore>,
    prompts: PromptLibrary,
    chat_model: String,
    word_limit: usize,
    generate_timeout: Duration,
}

impl Summarizer {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<SessionStore>,
        prompts: PromptLibrary,
        chat_model: impl Into<String>,
        word_limit: usize,
        generate_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            prompts,
            chat_model: chat_model.into(),
            word_limit,
            generate_timeout,
        }
    }

    /// Summarize a session's conversation.
    ///
    /// Errors only when the session itself is absent; model failures
    /// degrade to a truncated verbatim transcript.
    pub async fn summarize(&self, id: &SessionId) -> Result<String, SessionError> {
        let snapshot = self.store.snapshot(id).await?;

        if snapshot.turns.is_empty() {
            return Ok(EMPTY_SESSION_SUMMARY.to_string());
        }

        // Cache hit: nothing appended since the last summary.
        if let Some((text, at_turn_count)) = self.store.cached_summary(id).await? {
            if at_turn_count == snapshot.turn_count {
                debug!(session_id = %id, "Summarizer: cache hit");
                return Ok(text);
            }
        }

        let conversation = render_transcript(&snapshot.turns);
        let prompt = self
            .prompts
            .conversation_summary(&conversation, self.word_limit);
        let request = GenerateRequest::new(&self.chat_model, prompt, PromptKind::Summary);

        let generated =
            tokio::time::timeout(self.generate_timeout, self.provider.generate(request)).await;

        match generated {
            Ok(Ok(response)) => {
                let text = clamp_words(&response.text, self.word_limit);
                self.store.store_summary(id, text.clone()).await?;
                Ok(text)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Summarizer: model failed, degrading to transcript");
                Ok(self.degraded_summary(&snapshot.turns))
            }
            Err(_) => {
                warn!("Summarizer: model timed out, degrading to transcript");
                Ok(self.degraded_summary(&snapshot.turns))
            }
        }
    }

    /// Fallback summary: the most recent turn texts verbatim, clamped
    /// to the word bound. Not cached, so the next call retries the
    /// model.
    fn degraded_summary(&self, turns: &[Turn]) -> String {
        let start = turns.len().saturating_sub(3);
        let recent = render_transcript(&turns[start..]);
        clamp_words(&recent, self.word_limit)
    }
}

/// Render turns as a "User: / Assistant:" transcript.
fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .flat_map(|t| {
            [
                format!("User: {}", t.message),
                format!("Assistant: {}", t.answer),
            ]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clamp text to at most `limit` words; shorter text passes through
/// untouched.
fn clamp_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return text.trim().to_string();
    }
    words[..limit].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use waypost_core::error::ProviderError;
    use waypost_core::provider::GenerateResponse;
    use waypost_core::turn::AnswerTier;

    struct CountingProvider {
        reply: String,
        calls: Mutex<usize>,
        fail: bool,
    }

    impl CountingProvider {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                calls: Mutex::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                reply: String::new(),
                calls: Mutex::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(
            &self,
            _request: GenerateRequest,
        ) -> Result<GenerateResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(ProviderError::Network("down".into()));
            }
            Ok(GenerateResponse {
                text: self.reply.clone(),
                model: "test".into(),
            })
        }
    }

    fn summarizer_with(
        provider: Arc<CountingProvider>,
        store: Arc<SessionStore>,
    ) -> Summarizer {
        Summarizer::new(
            provider,
            store,
            PromptLibrary::new("ESCALATE_TO_HUMAN"),
            "test-model",
            200,
            Duration::from_secs(30),
        )
    }

    async fn seeded_session(store: &SessionStore, turns: usize) -> SessionId {
        let session = store.get_or_create(None).await;
        for i in 0..turns {
            store
                .append_turn(
                    &session.id,
                    Turn::new(
                        format!("question {i}"),
                        format!("answer {i}"),
                        AnswerTier::General,
                        None,
                    ),
                )
                .await
                .unwrap();
        }
        session.id
    }

    #[tokio::test]
    async fn empty_session_needs_no_model_call() {
        let store = Arc::new(SessionStore::new(24));
        let provider = Arc::new(CountingProvider::replying("summary"));
        let summarizer = summarizer_with(provider.clone(), store.clone());
        let id = seeded_session(&store, 0).await;

        let summary = summarizer.summarize(&id).await.unwrap();
        assert_eq!(summary, EMPTY_SESSION_SUMMARY);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn summary_is_cached_by_turn_count() {
        let store = Arc::new(SessionStore::new(24));
        let provider = Arc::new(CountingProvider::replying("The user asked questions."));
        let summarizer = summarizer_with(provider.clone(), store.clone());
        let id = seeded_session(&store, 3).await;

        let first = summarizer.summarize(&id).await.unwrap();
        let second = summarizer.summarize(&id).await.unwrap();

        assert_eq!(first, second);
        // Exactly one generative call across both invocations
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn new_turn_invalidates_cache() {
        let store = Arc::new(SessionStore::new(24));
        let provider = Arc::new(CountingProvider::replying("summary"));
        let summarizer = summarizer_with(provider.clone(), store.clone());
        let id = seeded_session(&store, 3).await;

        summarizer.summarize(&id).await.unwrap();
        store
            .append_turn(&id, Turn::new("new q", "new a", AnswerTier::General, None))
            .await
            .unwrap();
        summarizer.summarize(&id).await.unwrap();

        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn model_failure_degrades_to_transcript() {
        let store = Arc::new(SessionStore::new(24));
        let provider = Arc::new(CountingProvider::failing());
        let summarizer = summarizer_with(provider.clone(), store.clone());
        let id = seeded_session(&store, 2).await;

        let summary = summarizer.summarize(&id).await.unwrap();
        // Verbatim recent turn text, not an error
        assert!(summary.contains("question 1"));

        // Degraded summaries are not cached; the next call retries
        summarizer.summarize(&id).await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn summary_respects_word_limit() {
        let store = Arc::new(SessionStore::new(24));
        let long_reply = "word ".repeat(500);
        let provider = Arc::new(CountingProvider::replying(&long_reply));
        let summarizer = summarizer_with(provider, store.clone());
        let id = seeded_session(&store, 2).await;

        let summary = summarizer.summarize(&id).await.unwrap();
        assert!(summary.split_whitespace().count() <= 200);
    }

    #[tokio::test]
    async fn unknown_session_is_an_error() {
        let store = Arc::new(SessionStore::new(24));
        let provider = Arc::new(CountingProvider::replying("x"));
        let summarizer = summarizer_with(provider, store);

        let err = summarizer
            .summarize(&SessionId::from("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn clamp_words_passthrough_and_cut() {
        assert_eq!(clamp_words("a b c", 5), "a b c");
        assert_eq!(clamp_words("a b c d e f", 3), "a b c");
    }

    #[test]
    fn transcript_interleaves_roles() {
        let turns = vec![Turn::new("hi", "hello", AnswerTier::General, None)];
        let text = render_transcript(&turns);
        assert_eq!(text, "User: hi\nAssistant: hello");
    }
}
