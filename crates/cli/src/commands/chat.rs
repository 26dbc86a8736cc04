//! `waypost chat` — one-shot chat turn against an in-process engine.
//!
//! Builds the full engine locally (provider from config, fresh
//! in-memory index and session store), optionally ingests a knowledge
//! file, routes one message, and prints the outcome.

use std::path::Path;
use std::sync::Arc;

use waypost_config::AppConfig;
use waypost_core::index::KnowledgePayload;
use waypost_engine::ChatEngine;
use waypost_retrieval::{InMemoryIndex, KnowledgeIngestor};
use waypost_session::SessionStore;

use super::load_knowledge_file;

pub async fn run(message: &str, knowledge: Option<&Path>) -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    let router = waypost_providers::router::build_from_config(&config);
    let provider = router
        .default()
        .ok_or_else(|| anyhow::anyhow!("no default provider configured"))?;

    let index = Arc::new(InMemoryIndex::new());
    let store = Arc::new(SessionStore::new(config.session.ttl_hours));

    if let Some(path) = knowledge {
        let items: Vec<KnowledgePayload> = load_knowledge_file(path)?
            .into_iter()
            .map(|it| KnowledgePayload {
                question: it.question,
                answer: it.answer,
            })
            .collect();
        let ingestor = KnowledgeIngestor::new(provider.clone(), index.clone());
        let count = ingestor
            .ingest(items)
            .await
            .map_err(|e| anyhow::anyhow!("knowledge ingest failed: {e}"))?;
        println!("Loaded {count} knowledge items");
    }

    let engine = ChatEngine::new(provider, index, store, &config);
    let outcome = engine
        .chat(None, message, false, true)
        .await
        .map_err(|e| anyhow::anyhow!("chat failed: {e}"))?;

    println!("[{}] {}", outcome.tier, outcome.answer);
    if let Some(score) = outcome.confidence {
        println!("confidence: {score:.2}");
    }
    if let Some(reason) = &outcome.escalation_reason {
        println!("escalation reason: {reason}");
    }
    if let Some(suggestions) = &outcome.suggestions {
        if !suggestions.is_empty() {
            println!("\nSuggested next actions:");
            for s in suggestions {
                println!("  - {s}");
            }
        }
    }

    Ok(())
}
