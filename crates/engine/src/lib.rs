//! The Waypost chat engine — ties the tier router, session store,
//! summarizer, and action suggester into one request-facing facade.
//!
//! A chat turn flows:
//!
//! 1. **Validate** the message (empty input is request-fatal)
//! 2. **Resolve** the session (get-or-create; expired ids start fresh)
//! 3. **Route** through the confidence-gated tiers
//! 4. **Append** the finished turn atomically
//! 5. **Enrich** with summary / suggestions when requested (additive,
//!    never blocking the answer)

pub mod context;
pub mod prompts;
pub mod router;
pub mod suggest;
pub mod summarize;

pub use context::{AssembledContext, ContextAssembler};
pub use prompts::PromptLibrary;
pub use router::{ESCALATION_MESSAGE, EscalationPolicy, RoutingDecision, SentinelPolicy, TierRouter};
pub use suggest::ActionSuggester;
pub use summarize::{EMPTY_SESSION_SUMMARY, Summarizer};

use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use waypost_config::AppConfig;
use waypost_core::error::{EngineError, Error};
use waypost_core::index::VectorIndex;
use waypost_core::provider::Provider;
use waypost_core::turn::{AnswerTier, SessionId};
use waypost_retrieval::RetrievalGate;
use waypost_session::SessionStore;

/// How many prior turns a session needs before a chat turn will
/// auto-include a summary.
const SUMMARY_MIN_PRIOR_TURNS: u64 = 2;

/// The result of one chat turn.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub session_id: SessionId,
    pub answer: String,
    pub tier: AnswerTier,
    pub confidence: Option<f32>,
    pub escalation_reason: Option<String>,
    pub summary: Option<String>,
    pub suggestions: Option<Vec<String>>,
}

impl ChatOutcome {
    pub fn escalated(&self) -> bool {
        self.tier == AnswerTier::Escalated
    }
}

/// The engine facade. Owns every subsystem; cheap to share via `Arc`.
pub struct ChatEngine {
    store: Arc<SessionStore>,
    gate: Arc<RetrievalGate>,
    router: TierRouter,
    summarizer: Summarizer,
    suggester: ActionSuggester,
}

impl ChatEngine {
    pub fn new(
        provider: Arc<dyn Provider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<SessionStore>,
        config: &AppConfig,
    ) -> Self {
        let gate = Arc::new(RetrievalGate::new(
            provider.clone(),
            index,
            config.routing.clone(),
        ));
        let prompts = PromptLibrary::new(&config.routing.escalation_sentinel);
        let generate_timeout = Duration::from_secs(config.routing.generate_timeout_secs);

        let router = TierRouter::new(
            provider.clone(),
            gate.clone(),
            &config.routing,
            &config.chat_model,
            config.default_temperature,
        );

        let summarizer = Summarizer::new(
            provider.clone(),
            store.clone(),
            prompts.clone(),
            &config.chat_model,
            config.engine.summary_word_limit,
            generate_timeout,
        );

        let suggester = ActionSuggester::new(
            provider,
            prompts,
            &config.chat_model,
            config.engine.suggestion_count,
            generate_timeout,
        );

        Self {
            store,
            gate,
            router,
            summarizer,
            suggester,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handle one chat turn.
    pub async fn chat(
        &self,
        session_id: Option<&SessionId>,
        message: &str,
        include_summary: bool,
        include_suggestions: bool,
    ) -> Result<ChatOutcome, Error> {
        if message.trim().is_empty() {
            return Err(EngineError::EmptyMessage.into());
        }

        let session = self.store.get_or_create(session_id).await;
        let decision = self.router.route(message, &session.turns).await;

        info!(
            session_id = %session.id,
            tier = %decision.tier,
            confidence = ?decision.confidence,
            generative_calls = decision.generative_calls,
            "Chat turn routed"
        );

        let knowledge_context = decision.knowledge_context.clone();
        let tier = decision.tier;
        let confidence = decision.confidence;
        let escalation_reason = decision.escalation_reason.clone();
        let answer = decision.answer.clone();

        let turn = decision.into_turn(message);
        self.store.append_turn(&session.id, turn).await?;

        // Summary: only once the conversation has enough prior turns to
        // be worth condensing.
        let summary = if include_summary && session.turn_count >= SUMMARY_MIN_PRIOR_TURNS {
            Some(self.summarizer.summarize(&session.id).await?)
        } else {
            None
        };

        // Suggestions: additive, and skipped for escalated turns in the
        // chat flow (a human is taking over).
        let suggestions = if include_suggestions && tier != AnswerTier::Escalated {
            let snapshot = self.store.snapshot(&session.id).await?;
            Some(
                self.suggester
                    .suggest(
                        message,
                        &snapshot.turns,
                        knowledge_context.as_deref().unwrap_or(""),
                        Some(tier),
                    )
                    .await,
            )
        } else {
            None
        };

        Ok(ChatOutcome {
            session_id: session.id,
            answer,
            tier,
            confidence,
            escalation_reason,
            summary,
            suggestions,
        })
    }

    /// Summarize a session on demand. NotFound for unknown/expired ids.
    pub async fn summarize(&self, session_id: &SessionId) -> Result<String, Error> {
        Ok(self.summarizer.summarize(session_id).await?)
    }

    /// Suggest next actions for a session on demand.
    ///
    /// `query` overrides the anchor question; otherwise the latest user
    /// message in the session is used.
    pub async fn suggest_actions(
        &self,
        session_id: &SessionId,
        query: Option<&str>,
    ) -> Result<Vec<String>, Error> {
        let snapshot = self.store.snapshot(session_id).await?;

        let anchor = query
            .map(str::to_string)
            .or_else(|| snapshot.turns.last().map(|t| t.message.clone()))
            .unwrap_or_else(|| "How can I help you today?".to_string());

        let latest_tier = snapshot.turns.last().map(|t| t.tier);

        // Re-probe so the suggester sees the FAQ context for the anchor
        // question; a retrieval failure degrades to no context.
        let retrieval = self.gate.probe(&anchor).await;
        let faq_context = self.gate.context_block(&retrieval);

        Ok(self
            .suggester
            .suggest(&anchor, &snapshot.turns, &faq_context, latest_tier)
            .await)
    }
}
