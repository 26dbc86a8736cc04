//! `waypost ingest` — push a knowledge file to a running gateway.

use serde_json::json;
use std::path::Path;
use tracing::info;

use super::load_knowledge_file;

pub async fn run(file: &Path, url: &str) -> anyhow::Result<()> {
    let items = load_knowledge_file(file)?;
    info!(count = items.len(), "Ingesting knowledge items");

    let body = json!({
        "items": items
            .iter()
            .map(|it| json!({"question": it.question, "answer": it.answer}))
            .collect::<Vec<_>>(),
    });

    let endpoint = format!("{}/v1/knowledge", url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let response = client.post(&endpoint).json(&body).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("ingest failed ({status}): {body}");
    }

    let result: serde_json::Value = response.json().await?;
    println!(
        "Ingested {} knowledge items",
        result["count_ingested"].as_u64().unwrap_or(0)
    );
    Ok(())
}
