//! Tier router — the confidence-gated decision state machine.
//!
//! A turn moves through ordered guards:
//!
//! 1. top score ≥ T_fast  → fast path: stored answer verbatim, no
//!    generation call at all
//! 2. top score ≥ T       → FAQ-grounded generation
//! 3. otherwise           → general-knowledge generation; the model may
//!    emit the escalation sentinel
//! 4. sentinel or provider failure → escalation: fixed message, tag
//!    `escalated`
//!
//! The guards are evaluated top to bottom exactly once per turn; each
//! terminal outcome records how many generation calls it made so the
//! fast-path bypass is observable.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use waypost_config::RoutingConfig;
use waypost_core::error::ProviderError;
use waypost_core::provider::{GenerateRequest, PromptKind, Provider};
use waypost_core::turn::{AnswerTier, Turn};
use waypost_retrieval::RetrievalGate;

use crate::context::ContextAssembler;
use crate::prompts::PromptLibrary;

/// The fixed user-facing message for escalated turns. Never generated.
pub const ESCALATION_MESSAGE: &str = "I apologize, but I'm unable to provide a specific answer \
     to your question. Let me connect you with a human agent who can better assist you.";

/// Detects and strips the model's escalation request.
///
/// A strategy rather than an inlined check: the sentinel contract with
/// the model can change without touching router logic.
pub trait EscalationPolicy: Send + Sync {
    /// Does this response request escalation?
    fn wants_escalation(&self, response: &str) -> bool;

    /// Remove the marker from a response so it is never user-visible.
    fn strip(&self, response: &str) -> String;
}

/// Case-insensitive substring match on a configured sentinel string.
pub struct SentinelPolicy {
    sentinel: String,
}

impl SentinelPolicy {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    /// First byte offset of an ASCII-case-insensitive occurrence of the
    /// sentinel. Only char-boundary slices are compared, so multibyte
    /// response text cannot misalign the match.
    fn find(&self, text: &str) -> Option<usize> {
        let len = self.sentinel.len();
        if len == 0 {
            return None;
        }
        text.char_indices().find_map(|(i, _)| {
            text.get(i..i + len)
                .filter(|candidate| candidate.eq_ignore_ascii_case(&self.sentinel))
                .map(|_| i)
        })
    }
}

impl EscalationPolicy for SentinelPolicy {
    fn wants_escalation(&self, response: &str) -> bool {
        self.find(response).is_some()
    }

    fn strip(&self, response: &str) -> String {
        let mut out = String::with_capacity(response.len());
        let mut rest = response;
        while let Some(found) = self.find(rest) {
            out.push_str(&rest[..found]);
            rest = &rest[found + self.sentinel.len()..];
        }
        out.push_str(rest);
        out.trim().to_string()
    }
}

/// The transient outcome of routing one message.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// Which tier answered
    pub tier: AnswerTier,

    /// The final answer text
    pub answer: String,

    /// The retrieval confidence the decision used; absent for non-FAQ
    /// tiers
    pub confidence: Option<f32>,

    /// Why the turn escalated, when it did
    pub escalation_reason: Option<String>,

    /// Rendered FAQ context when the turn was FAQ-eligible; reused by
    /// the action suggester without re-probing the index
    pub knowledge_context: Option<String>,

    /// How many generation calls this turn made
    pub generative_calls: usize,
}

impl RoutingDecision {
    /// Build the immutable turn record for this decision.
    pub fn into_turn(self, message: &str) -> Turn {
        Turn::new(message, self.answer, self.tier, self.confidence)
    }
}

/// The router. Owns the gate, the assembler, and the prompt library;
/// borrows session history per call.
pub struct TierRouter {
    provider: Arc<dyn Provider>,
    gate: Arc<RetrievalGate>,
    assembler: ContextAssembler,
    prompts: PromptLibrary,
    escalation: Box<dyn EscalationPolicy>,
    chat_model: String,
    temperature: f32,
    generate_timeout: Duration,
}

impl TierRouter {
    pub fn new(
        provider: Arc<dyn Provider>,
        gate: Arc<RetrievalGate>,
        config: &RoutingConfig,
        chat_model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            provider,
            gate,
            assembler: ContextAssembler::new(config.max_context_chars, config.history_turns),
            prompts: PromptLibrary::new(&config.escalation_sentinel),
            escalation: Box::new(SentinelPolicy::new(&config.escalation_sentinel)),
            chat_model: chat_model.into(),
            temperature,
            generate_timeout: Duration::from_secs(config.generate_timeout_secs),
        }
    }

    /// Swap the escalation detection strategy.
    pub fn with_escalation_policy(mut self, policy: Box<dyn EscalationPolicy>) -> Self {
        self.escalation = policy;
        self
    }

    /// Route one message against the given session history.
    ///
    /// Never returns an error: every failure mode maps to a tier
    /// outcome, the coarsest being escalation.
    pub async fn route(&self, message: &str, history: &[Turn]) -> RoutingDecision {
        let retrieval = self.gate.probe(message).await;
        let top_score = retrieval.top_score();

        // ── Guard 1: fast path — stored answer verbatim, no generation ──
        if self.gate.is_fast_path(&retrieval) {
            let best = retrieval.top().expect("fast path implies a match");
            info!(score = top_score, "Router: fast path, returning stored answer");
            return RoutingDecision {
                tier: AnswerTier::Faq,
                answer: best.payload.answer.clone(),
                confidence: Some(top_score),
                escalation_reason: None,
                knowledge_context: Some(self.gate.context_block(&retrieval)),
                generative_calls: 0,
            };
        }

        // ── Guard 2: FAQ-grounded generation ───────────────────────────
        if self.gate.is_faq_eligible(&retrieval) {
            let knowledge = self.gate.context_block(&retrieval);
            let ctx = self.assembler.assemble(history, Some(&knowledge));
            let prompt = self
                .prompts
                .faq_response(&ctx.knowledge, &ctx.history, message);

            return match self.generate(prompt, PromptKind::FaqGrounded).await {
                Ok(text) => {
                    info!(score = top_score, "Router: FAQ-grounded answer generated");
                    RoutingDecision {
                        tier: AnswerTier::Faq,
                        answer: text,
                        confidence: Some(top_score),
                        escalation_reason: None,
                        knowledge_context: Some(knowledge),
                        generative_calls: 1,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Router: FAQ generation failed, escalating");
                    self.service_unavailable(1)
                }
            };
        }

        // ── Guard 3: general-knowledge attempt ─────────────────────────
        let ctx = self.assembler.assemble(history, None);
        let prompt = self.prompts.general_response(&ctx.history, message);

        match self.generate(prompt, PromptKind::General).await {
            Ok(text) => {
                if self.escalation.wants_escalation(&text) {
                    info!(score = top_score, "Router: model requested escalation");
                    RoutingDecision {
                        tier: AnswerTier::Escalated,
                        answer: ESCALATION_MESSAGE.to_string(),
                        confidence: None,
                        escalation_reason: Some(format!(
                            "Low similarity score: {top_score:.2}. Escalating to human agent."
                        )),
                        knowledge_context: None,
                        generative_calls: 1,
                    }
                } else {
                    info!(score = top_score, "Router: general-knowledge answer");
                    RoutingDecision {
                        tier: AnswerTier::General,
                        answer: text,
                        confidence: None,
                        escalation_reason: None,
                        knowledge_context: None,
                        generative_calls: 1,
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Router: general generation failed, escalating");
                self.service_unavailable(1)
            }
        }
    }

    fn service_unavailable(&self, calls_made: usize) -> RoutingDecision {
        RoutingDecision {
            tier: AnswerTier::Escalated,
            answer: ESCALATION_MESSAGE.to_string(),
            confidence: None,
            escalation_reason: Some("service unavailable".into()),
            knowledge_context: None,
            generative_calls: calls_made,
        }
    }

    /// Timeout-bounded generation call. The sentinel (if any) is
    /// stripped from the text before it can reach a user.
    async fn generate(
        &self,
        prompt: String,
        kind: PromptKind,
    ) -> Result<String, ProviderError> {
        let mut request = GenerateRequest::new(&self.chat_model, prompt, kind);
        request.temperature = self.temperature;

        let response = tokio::time::timeout(self.generate_timeout, self.provider.generate(request))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!(
                    "generation timed out after {}s",
                    self.generate_timeout.as_secs()
                ))
            })??;

        Ok(response.text)
    }

    /// Strip the sentinel from arbitrary text (exposed for partial
    /// outputs surfaced outside the normal path).
    pub fn strip_sentinel(&self, text: &str) -> String {
        self.escalation.strip(text)
    }
}
