use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of leading words kept in a citation snippet.
pub const SNIPPET_WORDS: usize = 8;

/// A loaded source document before splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub content: String,
}

/// An indexed slice of a document. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub content: String,
    /// Document the chunk came from (file path as loaded).
    pub source: String,
    /// Position of the chunk within its source.
    pub ordinal: usize,
}

impl Chunk {
    pub fn new(source: impl Into<String>, ordinal: usize, content: impl Into<String>) -> Self {
        let source = source.into();
        let content = content.into();
        let chunk_id = chunk_id(&source, ordinal, &content);
        Self {
            chunk_id,
            content,
            source,
            ordinal,
        }
    }
}

fn chunk_id(source: &str, ordinal: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(ordinal.to_le_bytes());
    hasher.update(b"\0");
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// A chunk paired with its relevance to one query (higher is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub doc: String,
    pub snippet: String,
    pub content: String,
}

impl Citation {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let doc = if chunk.source.trim().is_empty() {
            "N/A".to_string()
        } else {
            chunk.source.clone()
        };
        Self {
            doc,
            snippet: snippet(&chunk.content),
            content: chunk.content.clone(),
        }
    }
}

/// First `SNIPPET_WORDS` whitespace-separated tokens followed by an ellipsis.
pub fn snippet(content: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().take(SNIPPET_WORDS).collect();
    format!("{}...", words.join(" "))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalInfo {
    /// Number of chunks that passed the acceptance threshold.
    pub k: usize,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    /// Mean relevance of every retrieved chunk, 0.0 when nothing came back.
    pub grounding_score: f64,
    pub retrieval: RetrievalInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_keeps_first_eight_words() {
        let text = "Claims are settled within 30 days of receiving all required documents.";
        assert_eq!(snippet(text), "Claims are settled within 30 days of receiving...");
    }

    #[test]
    fn snippet_collapses_whitespace_and_handles_short_text() {
        assert_eq!(snippet("  KYC\n\nrules   apply "), "KYC rules apply...");
        assert_eq!(snippet(""), "...");
    }

    #[test]
    fn citation_defaults_missing_source() {
        let chunk = Chunk::new("", 0, "text");
        assert_eq!(Citation::from_chunk(&chunk).doc, "N/A");

        let chunk = Chunk::new("data/faq.txt", 0, "text");
        assert_eq!(Citation::from_chunk(&chunk).doc, "data/faq.txt");
    }

    #[test]
    fn chunk_ids_depend_on_position_and_content() {
        let a = Chunk::new("data/faq.txt", 0, "same");
        let b = Chunk::new("data/faq.txt", 1, "same");
        let c = Chunk::new("data/faq.txt", 0, "same");

        assert_ne!(a.chunk_id, b.chunk_id);
        assert_eq!(a.chunk_id, c.chunk_id);
        assert_eq!(a.chunk_id.len(), 64);
    }
}
