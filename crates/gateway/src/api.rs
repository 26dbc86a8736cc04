//! The v1 REST API.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`            — Route a message, get the answer
//! - `POST /v1/summarize`       — Summarize a session's conversation
//! - `POST /v1/suggest-actions` — Suggest next actions for a session
//! - `POST /v1/knowledge`       — Ingest FAQ items into the index
//! - `GET  /v1/sessions/stats`  — Session store statistics
//!
//! Error mapping follows the failure taxonomy: malformed input is a
//! 400 with a reason code, unknown sessions (where creation is not
//! implied) are 404, collaborator outages with no degradation path are
//! 503.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use waypost_core::error::{EngineError, Error, SessionError};
use waypost_core::index::{KnowledgePayload, VectorIndex};
use waypost_core::turn::SessionId;
use waypost_engine::ChatEngine;
use waypost_retrieval::KnowledgeIngestor;
use waypost_session::{SessionStore, StoreStats};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct GatewayState {
    pub engine: ChatEngine,
    pub ingestor: KnowledgeIngestor,
    pub index: Arc<dyn VectorIndex>,
    pub store: Arc<SessionStore>,
}

pub type SharedState = Arc<GatewayState>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/summarize", post(summarize_handler))
        .route("/suggest-actions", post(suggest_actions_handler))
        .route("/knowledge", post(ingest_knowledge_handler))
        .route("/sessions/stats", get(session_stats_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    /// Existing session id (omit to start a new session).
    #[serde(default)]
    session_id: Option<String>,
    /// The user's message.
    message: String,
    /// Include a conversation summary in the response.
    #[serde(default)]
    include_summary: bool,
    /// Include next-action suggestions in the response.
    #[serde(default = "default_true")]
    include_suggestions: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    answer: String,
    source_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence_score: Option<f32>,
    escalated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    escalation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct SummaryRequest {
    session_id: String,
}

#[derive(Serialize)]
struct SummaryResponse {
    session_id: String,
    summary: String,
}

#[derive(Deserialize)]
struct ActionsRequest {
    session_id: String,
    /// Optional anchor question; defaults to the latest user message.
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct ActionsResponse {
    session_id: String,
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct IngestItemDto {
    question: String,
    answer: String,
}

#[derive(Deserialize)]
struct IngestRequest {
    items: Vec<IngestItemDto>,
}

#[derive(Serialize)]
struct IngestResponse {
    count_ingested: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a domain error onto the HTTP boundary.
fn map_error(err: Error) -> ApiError {
    match &err {
        Error::Engine(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.reason_code(),
                message: err.to_string(),
            }),
        ),
        Error::Session(SessionError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "SESSION_NOT_FOUND",
                message: err.to_string(),
            }),
        ),
        Error::Session(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "SESSION_ERROR",
                message: err.to_string(),
            }),
        ),
        Error::Provider(_) | Error::Retrieval(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "SERVICE_UNAVAILABLE",
                message: err.to_string(),
            }),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "INTERNAL_ERROR",
                message: err.to_string(),
            }),
        ),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(
        has_session = payload.session_id.is_some(),
        "v1/chat request"
    );

    let session_id = payload.session_id.as_deref().map(SessionId::from);

    let outcome = state
        .engine
        .chat(
            session_id.as_ref(),
            &payload.message,
            payload.include_summary,
            payload.include_suggestions,
        )
        .await
        .map_err(map_error)?;

    Ok(Json(ChatResponse {
        session_id: outcome.session_id.to_string(),
        answer: outcome.answer.clone(),
        source_tag: outcome.tier.as_str().into(),
        confidence_score: outcome.confidence,
        escalated: outcome.escalated(),
        escalation_reason: outcome.escalation_reason.clone(),
        summary: outcome.summary.clone(),
        suggestions: outcome.suggestions,
    }))
}

async fn summarize_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let session_id = SessionId::from(&payload.session_id);
    let summary = state
        .engine
        .summarize(&session_id)
        .await
        .map_err(map_error)?;

    Ok(Json(SummaryResponse {
        session_id: payload.session_id,
        summary,
    }))
}

async fn suggest_actions_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ActionsRequest>,
) -> Result<Json<ActionsResponse>, ApiError> {
    let session_id = SessionId::from(&payload.session_id);
    let suggestions = state
        .engine
        .suggest_actions(&session_id, payload.query.as_deref())
        .await
        .map_err(map_error)?;

    Ok(Json(ActionsResponse {
        session_id: payload.session_id,
        suggestions,
    }))
}

async fn ingest_knowledge_handler(
    State(state): State<SharedState>,
    Json(payload): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    if payload.items.is_empty() {
        return Err(map_error(EngineError::EmptyIngest.into()));
    }

    let items: Vec<KnowledgePayload> = payload
        .items
        .into_iter()
        .map(|it| KnowledgePayload {
            question: it.question,
            answer: it.answer,
        })
        .collect();

    let count_ingested = state.ingestor.ingest(items).await.map_err(map_error)?;

    Ok((StatusCode::CREATED, Json(IngestResponse { count_ingested })))
}

async fn session_stats_handler(State(state): State<SharedState>) -> Json<StoreStats> {
    Json(state.store.stats().await)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use waypost_config::AppConfig;
    use waypost_core::error::ProviderError;
    use waypost_core::provider::{GenerateRequest, GenerateResponse, Provider};
    use waypost_retrieval::InMemoryIndex;

    /// Deterministic test provider: embeds by text hash, generates a
    /// canned reply.
    struct TestProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for TestProvider {
        fn name(&self) -> &str {
            "test"
        }

        async fn generate(
            &self,
            _request: GenerateRequest,
        ) -> Result<GenerateResponse, ProviderError> {
            Ok(GenerateResponse {
                text: self.reply.clone(),
                model: "test-model".into(),
            })
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let sum: u32 = t.bytes().map(u32::from).sum();
                    vec![(sum % 97) as f32 + 1.0, (sum % 89) as f32, 1.0]
                })
                .collect())
        }
    }

    fn test_router(reply: &str) -> Router {
        let config = AppConfig::default();
        let provider = Arc::new(TestProvider {
            reply: reply.into(),
        });
        let index = Arc::new(InMemoryIndex::new());
        let store = Arc::new(SessionStore::new(config.session.ttl_hours));
        let engine = ChatEngine::new(provider.clone(), index.clone(), store.clone(), &config);
        let ingestor = KnowledgeIngestor::new(provider, index.clone());

        build_router(Arc::new(GatewayState {
            engine,
            ingestor,
            index,
            store,
        }))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = test_router("x");
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_round_trip() {
        let app = test_router("A general answer.");
        let response = app
            .oneshot(post_json(
                "/v1/chat",
                serde_json::json!({"message": "hello there", "include_suggestions": false}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["answer"], "A general answer.");
        assert_eq!(json["source_tag"], "general");
        assert_eq!(json["escalated"], false);
        assert!(json["session_id"].is_string());
    }

    #[tokio::test]
    async fn chat_empty_message_is_bad_request() {
        let app = test_router("x");
        let response = app
            .oneshot(post_json(
                "/v1/chat",
                serde_json::json!({"message": "   "}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "EMPTY_MESSAGE");
    }

    #[tokio::test]
    async fn chat_continues_session() {
        let app = test_router("answer");
        let first = app
            .clone()
            .oneshot(post_json(
                "/v1/chat",
                serde_json::json!({"message": "first", "include_suggestions": false}),
            ))
            .await
            .unwrap();
        let first_json = body_json(first).await;
        let sid = first_json["session_id"].as_str().unwrap().to_string();

        let second = app
            .oneshot(post_json(
                "/v1/chat",
                serde_json::json!({"session_id": sid, "message": "second", "include_suggestions": false}),
            ))
            .await
            .unwrap();
        let second_json = body_json(second).await;
        assert_eq!(second_json["session_id"].as_str().unwrap(), sid);
    }

    #[tokio::test]
    async fn summarize_unknown_session_is_not_found() {
        let app = test_router("x");
        let response = app
            .oneshot(post_json(
                "/v1/summarize",
                serde_json::json!({"session_id": "no-such-session"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn summarize_existing_session() {
        let app = test_router("a concise summary");
        let chat = app
            .clone()
            .oneshot(post_json(
                "/v1/chat",
                serde_json::json!({"message": "hello", "include_suggestions": false}),
            ))
            .await
            .unwrap();
        let sid = body_json(chat).await["session_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(post_json(
                "/v1/summarize",
                serde_json::json!({"session_id": sid}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["summary"], "a concise summary");
    }

    #[tokio::test]
    async fn ingest_knowledge_and_fast_path() {
        let app = test_router("should not be generated");

        // Ingest one FAQ item
        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/knowledge",
                serde_json::json!({"items": [
                    {"question": "How do I reset my password?",
                     "answer": "Use the reset link on the login page."}
                ]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["count_ingested"], 1);

        // The identical question embeds to the identical vector:
        // similarity 1.0 takes the fast path and returns the stored
        // answer verbatim.
        let response = app
            .oneshot(post_json(
                "/v1/chat",
                serde_json::json!({
                    "message": "How do I reset my password?\nUse the reset link on the login page.",
                    "include_suggestions": false
                }),
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["source_tag"], "faq");
        assert_eq!(json["answer"], "Use the reset link on the login page.");
    }

    #[tokio::test]
    async fn suggest_actions_unknown_session_is_not_found() {
        let app = test_router("x");
        let response = app
            .oneshot(post_json(
                "/v1/suggest-actions",
                serde_json::json!({"session_id": "no-such-session"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn suggest_actions_for_existing_session() {
        let app = test_router("How do I update my payment method?");
        let chat = app
            .clone()
            .oneshot(post_json(
                "/v1/chat",
                serde_json::json!({"message": "billing question", "include_suggestions": false}),
            ))
            .await
            .unwrap();
        let sid = body_json(chat).await["session_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(post_json(
                "/v1/suggest-actions",
                serde_json::json!({"session_id": sid}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["suggestions"].as_array().is_some_and(|a| !a.is_empty()));
    }

    #[tokio::test]
    async fn ingest_empty_items_is_bad_request() {
        let app = test_router("x");
        let response = app
            .oneshot(post_json("/v1/knowledge", serde_json::json!({"items": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "EMPTY_INGEST");
    }

    #[tokio::test]
    async fn session_stats_endpoint() {
        let app = test_router("answer");
        app.clone()
            .oneshot(post_json(
                "/v1/chat",
                serde_json::json!({"message": "hello", "include_suggestions": false}),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/sessions/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["active_sessions"], 1);
        assert_eq!(json["total_turns"], 1);
    }
}
