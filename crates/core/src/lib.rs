//! # Waypost Core
//!
//! Domain types, traits, and error definitions for the Waypost tiered
//! answer-routing engine. This crate has **zero framework dependencies**
//! beyond serde; it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (generative model, embedding service,
//! vector index) is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod index;
pub mod provider;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use error::{EngineError, Error, ProviderError, Result, RetrievalError, SessionError};
pub use index::{KnowledgePayload, RetrievalMatch, RetrievalResult, VectorIndex};
pub use provider::{GenerateRequest, GenerateResponse, PromptKind, Provider};
pub use turn::{AnswerTier, SessionId, SessionSnapshot, Turn};
