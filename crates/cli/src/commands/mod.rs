pub mod chat;
pub mod config_cmd;
pub mod ingest;
pub mod serve;

use serde::Deserialize;
use std::path::Path;

/// A knowledge file entry: `[{"question": "...", "answer": "..."}]`.
#[derive(Debug, Deserialize)]
pub struct KnowledgeFileItem {
    pub question: String,
    pub answer: String,
}

/// Load and parse a knowledge JSON file.
pub fn load_knowledge_file(path: &Path) -> anyhow::Result<Vec<KnowledgeFileItem>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let items: Vec<KnowledgeFileItem> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid knowledge file {}: {e}", path.display()))?;
    anyhow::ensure!(!items.is_empty(), "knowledge file is empty");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_knowledge_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faq.json");
        std::fs::write(
            &path,
            r#"[{"question": "How do I reset my password?", "answer": "Use the reset link."}]"#,
        )
        .unwrap();

        let items = load_knowledge_file(&path).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question, "How do I reset my password?");
    }

    #[test]
    fn rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faq.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(load_knowledge_file(&path).is_err());
    }

    #[test]
    fn rejects_missing_file() {
        assert!(load_knowledge_file(Path::new("/no/such/file.json")).is_err());
    }
}
