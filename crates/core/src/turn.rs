//! Session and Turn domain types.
//!
//! These are the core value objects that flow through the entire system:
//! User sends a message → Router picks a tier → the finished turn is
//! appended to its session → Summarizer and Suggester read it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session (one ongoing conversation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which response strategy produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerTier {
    /// Answered from the curated knowledge base
    Faq,
    /// Answered from open-domain model knowledge
    General,
    /// Handed off to a human agent
    Escalated,
}

impl AnswerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faq => "faq",
            Self::General => "general",
            Self::Escalated => "escalated",
        }
    }
}

impl std::fmt::Display for AnswerTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request/response exchange within a session.
///
/// Immutable once appended; `index` is strictly increasing and gapless
/// within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Zero-based sequence index within the session
    pub index: u64,

    /// The user's message text
    pub message: String,

    /// The answer returned to the user
    pub answer: String,

    /// Which tier produced the answer
    pub tier: AnswerTier,

    /// Retrieval confidence score; absent for non-FAQ tiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// When the turn completed
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Build a turn with the current timestamp. The store assigns `index`.
    pub fn new(
        message: impl Into<String>,
        answer: impl Into<String>,
        tier: AnswerTier,
        confidence: Option<f32>,
    ) -> Self {
        Self {
            index: 0,
            message: message.into(),
            answer: answer.into(),
            tier,
            confidence,
            timestamp: Utc::now(),
        }
    }
}

/// A point-in-time copy of a session handed to callers.
///
/// The store exclusively owns the live session; snapshots never alias
/// its mutable state, so no component retains session data beyond the
/// duration of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// The session's id
    pub id: SessionId,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Last time a turn or touch updated the session
    pub last_activity: DateTime<Utc>,

    /// Completed turns in arrival order
    pub turns: Vec<Turn>,

    /// Total turns appended (equals `turns.len()` for full snapshots)
    pub turn_count: u64,
}

impl SessionSnapshot {
    /// The most recent turns, oldest first. Used to build prompt history.
    pub fn recent_turns(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}
