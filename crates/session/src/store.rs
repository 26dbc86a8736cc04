//! In-memory session store with per-session serialization and TTL
//! expiry.
//!
//! The store is the single shared mutable resource in the system. The
//! outer `RwLock<HashMap>` is held only long enough to look up or
//! insert an entry; all per-session mutation happens under that
//! session's own `Mutex`, so concurrent turns on the same session
//! serialize while unrelated sessions proceed unimpeded.
//!
//! Expiry is lazy plus swept: every lookup filters by
//! `last_activity + ttl`, so an expired-but-unswept session already
//! behaves as absent; the sweep then reclaims the memory. The sweep
//! takes the per-session lock before removal, so it can never
//! interleave with an in-flight append on the same session.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use waypost_core::error::SessionError;
use waypost_core::turn::{SessionId, SessionSnapshot, Turn};

struct CachedSummary {
    text: String,
    at_turn_count: u64,
}

struct SessionState {
    id: SessionId,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    turns: Vec<Turn>,
    turn_count: u64,
    summary: Option<CachedSummary>,
    /// Set by the sweep under the per-session lock; a locked-but-removed
    /// entry must not accept further writes.
    removed: bool,
}

impl SessionState {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            created_at: now,
            last_activity: now,
            turns: Vec::new(),
            turn_count: 0,
            summary: None,
            removed: false,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            turns: self.turns.clone(),
            turn_count: self.turn_count,
        }
    }
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub active_sessions: usize,
    pub total_turns: u64,
    pub sessions_expiring_soon: usize,
}

/// The session store. Cheap to clone via `Arc` at the composition root.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionState>>>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store whose sessions expire after `ttl_hours` of
    /// inactivity.
    pub fn new(ttl_hours: u64) -> Self {
        Self::with_ttl(Duration::hours(ttl_hours as i64))
    }

    /// Create a store with an explicit TTL. Used by tests that need
    /// sub-second expiry.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, state: &SessionState, now: DateTime<Utc>) -> bool {
        now - state.last_activity > self.ttl
    }

    /// Look up a live entry by id. Expired or removed entries are
    /// treated as absent.
    async fn live_entry(&self, id: &SessionId) -> Option<Arc<Mutex<SessionState>>> {
        let entry = self.sessions.read().await.get(id).cloned()?;
        let state = entry.lock().await;
        if state.removed || self.is_expired(&state, Utc::now()) {
            return None;
        }
        drop(state);
        Some(entry)
    }

    /// Get an existing live session or create a fresh one.
    ///
    /// An unknown, expired, or absent id yields a brand-new session
    /// with a new id; a prior id never resolves to old turns once
    /// expired. The returned snapshot reflects the session before the
    /// current turn is appended.
    pub async fn get_or_create(&self, id: Option<&SessionId>) -> SessionSnapshot {
        if let Some(id) = id {
            if let Some(entry) = self.live_entry(id).await {
                let mut state = entry.lock().await;
                state.last_activity = Utc::now();
                return state.snapshot();
            }
        }

        let state = SessionState::new();
        let snapshot = state.snapshot();
        let id = state.id.clone();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(state)));
        info!(session_id = %id, "Created new session");
        snapshot
    }

    /// Append a completed turn to a session.
    ///
    /// Assigns the turn's sequence index under the per-session lock,
    /// so indices are strictly increasing and gapless even under
    /// concurrent appends. The whole turn (message, answer, tag,
    /// score) becomes visible atomically.
    pub async fn append_turn(&self, id: &SessionId, mut turn: Turn) -> Result<Turn, SessionError> {
        let entry = self
            .live_entry(id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        let mut state = entry.lock().await;
        if state.removed {
            return Err(SessionError::NotFound(id.to_string()));
        }

        turn.index = state.turn_count;
        state.turn_count += 1;
        state.last_activity = Utc::now();
        state.turns.push(turn.clone());

        debug!(session_id = %id, index = turn.index, tier = %turn.tier, "Turn appended");
        Ok(turn)
    }

    /// Update a session's last-activity timestamp.
    pub async fn touch(&self, id: &SessionId) -> Result<(), SessionError> {
        let entry = self
            .live_entry(id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.lock().await.last_activity = Utc::now();
        Ok(())
    }

    /// A point-in-time copy of a session. NotFound for absent or
    /// expired ids.
    pub async fn snapshot(&self, id: &SessionId) -> Result<SessionSnapshot, SessionError> {
        let entry = self
            .live_entry(id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let state = entry.lock().await;
        Ok(state.snapshot())
    }

    /// The cached summary and the turn count it was computed at.
    pub async fn cached_summary(
        &self,
        id: &SessionId,
    ) -> Result<Option<(String, u64)>, SessionError> {
        let entry = self
            .live_entry(id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let state = entry.lock().await;
        Ok(state
            .summary
            .as_ref()
            .map(|s| (s.text.clone(), s.at_turn_count)))
    }

    /// Cache a summary at the session's current turn count.
    pub async fn store_summary(&self, id: &SessionId, text: String) -> Result<(), SessionError> {
        let entry = self
            .live_entry(id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let mut state = entry.lock().await;
        let at = state.turn_count;
        state.summary = Some(CachedSummary {
            text,
            at_turn_count: at,
        });
        Ok(())
    }

    /// Explicitly delete a session. Returns whether it existed.
    pub async fn delete(&self, id: &SessionId) -> bool {
        let entry = self.sessions.read().await.get(id).cloned();
        let Some(entry) = entry else {
            return false;
        };
        let mut state = entry.lock().await;
        state.removed = true;
        drop(state);
        self.sessions.write().await.remove(id).is_some()
    }

    /// Remove every session whose inactivity exceeds `ttl` as of `now`.
    /// Returns the count removed.
    ///
    /// Takes each candidate's per-session lock before removal and
    /// re-checks expiry under it, so a concurrent append that revived
    /// the session wins.
    pub async fn expire_sweep(&self, now: DateTime<Utc>) -> usize {
        let candidates: Vec<(SessionId, Arc<Mutex<SessionState>>)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect()
        };

        let mut removed = 0;
        for (id, entry) in candidates {
            let mut state = entry.lock().await;
            if state.removed || !self.is_expired(&state, now) {
                continue;
            }
            state.removed = true;
            drop(state);
            if self.sessions.write().await.remove(&id).is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Expired sessions swept");
        }
        removed
    }

    /// Store statistics: live sessions, total turns, sessions within an
    /// hour of expiry.
    pub async fn stats(&self) -> StoreStats {
        let now = Utc::now();
        let soon = Duration::hours(1);
        let entries: Vec<Arc<Mutex<SessionState>>> =
            self.sessions.read().await.values().cloned().collect();

        let mut active = 0;
        let mut total_turns = 0;
        let mut expiring_soon = 0;

        for entry in entries {
            let state = entry.lock().await;
            if state.removed || self.is_expired(&state, now) {
                continue;
            }
            active += 1;
            total_turns += state.turn_count;
            if now - state.last_activity + soon > self.ttl {
                expiring_soon += 1;
            }
        }

        StoreStats {
            active_sessions: active,
            total_turns,
            sessions_expiring_soon: expiring_soon,
        }
    }
}
