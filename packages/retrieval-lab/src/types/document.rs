//! Corpus documents.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A passage of the corpus, identified by a content-derived chunk id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub chunk_id: String,
    pub text: String,

    /// Filterable fields (e.g. `category`, `title`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// Create a document whose chunk id is derived from its text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            chunk_id: chunk_id(&text),
            text,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a document with an explicit id.
    pub fn with_id(chunk_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Build a titled paper document (`Title:..\nAbstract:..`) tagged with its category.
    pub fn paper(title: &str, abstract_text: &str, category: &str) -> Self {
        Self::new(format!("Title:{}\nAbstract:{}", title, abstract_text))
            .with_field("title", title)
            .with_field("category", category)
    }
}

/// Hex SHA-256 of the passage text.
pub fn chunk_id(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_stable() {
        let a = Document::new("The quick brown fox");
        let b = Document::new("The quick brown fox");
        let c = Document::new("The quick brown fox.");

        assert_eq!(a.chunk_id, b.chunk_id);
        assert_ne!(a.chunk_id, c.chunk_id);
        assert_eq!(a.chunk_id.len(), 64);
    }

    #[test]
    fn test_paper_document() {
        let doc = Document::paper("Dense Retrieval", "We study...", "cs.IR");
        assert_eq!(doc.text, "Title:Dense Retrieval\nAbstract:We study...");
        assert_eq!(doc.field("category"), Some("cs.IR"));
        assert_eq!(doc.field("title"), Some("Dense Retrieval"));
    }

    #[test]
    fn test_metadata_optional_in_json() {
        let doc: Document = serde_json::from_str(r#"{"chunk_id":"a","text":"t"}"#).unwrap();
        assert!(doc.metadata.is_empty());
    }
}
