//! Context-retrieval types for Suasion.
//!
//! The retrieval boundary grounds a dialogue turn with snippets recalled
//! from an external knowledge index. Retrieval is strictly best-effort:
//! every failure mode degrades to the unaugmented prompt.

use serde::{Deserialize, Serialize};

/// A single snippet recalled from the knowledge index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSnippet {
    pub content: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Outcome of a retrieval call for one turn.
///
/// When `should_enhance` is false (nothing relevant found, or the index
/// declined), the executor proceeds with the composed prompt unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub should_enhance: bool,
    /// Fully-assembled replacement system message, when the retriever
    /// chose to build one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_system_text: Option<String>,
    #[serde(default)]
    pub snippets: Vec<RetrievedSnippet>,
}

/// Errors from retrieval operations.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("retrieval request failed: {0}")]
    Http(String),

    #[error("retrieval response malformed: {0}")]
    Deserialization(String),

    #[error("retrieval is not configured")]
    Disabled,
}
